use std::sync::Mutex;

use super::*;

/// Records the parameters it was called with and writes fixed bytes.
#[derive(Default)]
struct RecordingEngine {
    calls: Mutex<Vec<(String, VoiceParams)>>,
}

impl SpeechEngine for RecordingEngine {
    fn synthesize(&self, text: &str, params: &VoiceParams, out: &Path) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), params.clone()));
        std::fs::write(out, b"ID3fake-mp3")?;
        Ok(())
    }
}

struct Unreachable;

impl SpeechEngine for Unreachable {
    fn synthesize(&self, _: &str, _: &VoiceParams, _: &Path) -> anyhow::Result<()> {
        anyhow::bail!("connection refused")
    }
}

struct WritesNothing;

impl SpeechEngine for WritesNothing {
    fn synthesize(&self, _: &str, _: &VoiceParams, _: &Path) -> anyhow::Result<()> {
        Ok(())
    }
}

struct WritesEmpty;

impl SpeechEngine for WritesEmpty {
    fn synthesize(&self, _: &str, _: &VoiceParams, out: &Path) -> anyhow::Result<()> {
        std::fs::write(out, b"")?;
        Ok(())
    }
}

fn synth(engine: impl SpeechEngine + 'static) -> VoiceSynthesizer {
    VoiceSynthesizer::new(Arc::new(engine), VoiceConfig::default())
}

#[test]
fn profiles_parse_case_insensitively() {
    assert_eq!("MALE".parse::<VoiceProfile>().unwrap(), VoiceProfile::Male);
    assert_eq!(" Female ".parse::<VoiceProfile>().unwrap(), VoiceProfile::Female);
    let err = "robot".parse::<VoiceProfile>().unwrap_err();
    assert!(matches!(err, VoxError::InputValidation(_)));
    assert_eq!(VoiceProfile::Female.to_string(), "female");
}

#[test]
fn profiles_map_to_distinct_deterministic_params() {
    let s = synth(RecordingEngine::default());
    let male = s.params_for(VoiceProfile::Male);
    let female = s.params_for(VoiceProfile::Female);
    assert_eq!(
        male,
        VoiceParams {
            lang: "en".into(),
            tld: "com".into()
        }
    );
    assert_eq!(
        female,
        VoiceParams {
            lang: "en".into(),
            tld: "com.au".into()
        }
    );
    assert_ne!(male, female);
    assert_eq!(s.params_for(VoiceProfile::Male), male);
}

#[test]
fn synthesize_writes_one_file_and_passes_params() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("voice.mp3");
    let engine = Arc::new(RecordingEngine::default());
    let s = VoiceSynthesizer::new(engine.clone(), VoiceConfig::default());

    let audio = s.synthesize("Hello World", VoiceProfile::Female, &out).unwrap();
    assert_eq!(audio.path, out);
    assert!(out.is_file());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    let calls = engine.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "Hello World");
    assert_eq!(calls[0].1.tld, "com.au");
}

#[test]
fn blank_text_is_a_synthesis_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = synth(RecordingEngine::default())
        .synthesize("   ", VoiceProfile::Male, &dir.path().join("v.mp3"))
        .unwrap_err();
    assert!(matches!(err, VoxError::Synthesis(_)));
}

#[test]
fn engine_failure_is_a_generic_synthesis_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = synth(Unreachable)
        .synthesize("hi", VoiceProfile::Male, &dir.path().join("v.mp3"))
        .unwrap_err();
    assert!(matches!(err, VoxError::Synthesis(_)));
    assert_eq!(err.to_string(), "synthesis error: voice synthesis failed");
}

#[test]
fn missing_or_empty_output_is_a_synthesis_error() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("v.mp3");
    assert!(matches!(
        synth(WritesNothing).synthesize("hi", VoiceProfile::Male, &out),
        Err(VoxError::Synthesis(_))
    ));
    assert!(matches!(
        synth(WritesEmpty).synthesize("hi", VoiceProfile::Male, &out),
        Err(VoxError::Synthesis(_))
    ));
}

#[test]
fn split_text_respects_limit_and_word_boundaries() {
    assert!(split_text("   ", 100).is_empty());
    assert_eq!(split_text("Hello World", 100), vec!["Hello World"]);
    assert_eq!(split_text("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
    assert_eq!(split_text("abcdefgh xy", 3), vec!["abc", "def", "gh", "xy"]);

    let long = "word ".repeat(60);
    let chunks = split_text(&long, MAX_CHUNK_CHARS);
    assert!(chunks.iter().all(|c| c.chars().count() <= MAX_CHUNK_CHARS));
    assert_eq!(chunks.join(" "), long.trim());
}

#[test]
fn google_tts_endpoint_substitutes_tld() {
    let tts = GoogleTts::new(&VoiceConfig::default()).unwrap();
    assert_eq!(
        tts.endpoint("com.au"),
        "https://translate.google.com.au/translate_tts"
    );
    assert_eq!(tts.file_extension(), "mp3");
}

#[test]
fn google_tts_unreachable_endpoint_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = VoiceConfig {
        endpoint_template: "http://127.0.0.1:9/{tld}/translate_tts".into(),
        timeout_secs: 2,
        ..VoiceConfig::default()
    };
    let s = VoiceSynthesizer::new(Arc::new(GoogleTts::new(&cfg).unwrap()), cfg);
    let out = dir.path().join("v.mp3");
    let err = s.synthesize("hello", VoiceProfile::Male, &out).unwrap_err();
    assert!(matches!(err, VoxError::Synthesis(_)));
    assert!(!out.exists());
}
