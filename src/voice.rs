//! Narration synthesis: voice profiles, the speech-engine boundary and the Google Translate TTS
//! engine.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::config::VoiceConfig;
use crate::foundation::error::{VoxError, VoxResult};
use crate::video::AudioAsset;

/// Narrator voice selected by the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceProfile {
    /// Male narrator.
    Male,
    /// Female narrator.
    Female,
}

impl FromStr for VoiceProfile {
    type Err = VoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(VoxError::input("gender must be 'male' or 'female'")),
        }
    }
}

impl fmt::Display for VoiceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Male => "male",
            Self::Female => "female",
        })
    }
}

/// Engine parameters a profile maps to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoiceParams {
    /// Language code.
    pub lang: String,
    /// Regional endpoint variant (accent).
    pub tld: String,
}

/// A text-to-speech backend.
pub trait SpeechEngine: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str {
        "speech-engine"
    }

    /// Extension of the files this engine writes.
    fn file_extension(&self) -> &str {
        "mp3"
    }

    /// Synthesize `text` into an encoded audio file at `out`.
    fn synthesize(&self, text: &str, params: &VoiceParams, out: &Path) -> anyhow::Result<()>;
}

/// Maximum characters per Google Translate TTS request.
pub const MAX_CHUNK_CHARS: usize = 100;

/// Google Translate TTS over blocking HTTP.
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: reqwest::blocking::Client,
    endpoint_template: String,
}

impl GoogleTts {
    /// Build a client with the configured timeout and endpoint template.
    pub fn new(config: &VoiceConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("voxreel/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build tts http client")?;
        Ok(Self {
            client,
            endpoint_template: config.endpoint_template.clone(),
        })
    }

    /// Endpoint URL for a regional variant.
    pub fn endpoint(&self, tld: &str) -> String {
        self.endpoint_template.replace("{tld}", tld)
    }
}

impl SpeechEngine for GoogleTts {
    fn name(&self) -> &str {
        "google-translate-tts"
    }

    fn synthesize(&self, text: &str, params: &VoiceParams, out: &Path) -> anyhow::Result<()> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        anyhow::ensure!(!chunks.is_empty(), "no text to synthesize");

        let url = self.endpoint(&params.tld);
        let total = chunks.len().to_string();
        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let idx_s = idx.to_string();
            let textlen = chunk.chars().count().to_string();
            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("ie", "UTF-8"),
                    ("q", chunk.as_str()),
                    ("tl", params.lang.as_str()),
                    ("client", "tw-ob"),
                    ("total", total.as_str()),
                    ("idx", idx_s.as_str()),
                    ("textlen", textlen.as_str()),
                ])
                .send()
                .with_context(|| format!("request tts chunk {}/{} from {url}", idx + 1, total))?
                .error_for_status()
                .with_context(|| format!("tts chunk {}/{} rejected", idx + 1, total))?;
            let body = resp
                .bytes()
                .with_context(|| format!("read tts chunk {}/{}", idx + 1, total))?;
            tracing::debug!(chunk = idx, bytes = body.len(), "tts chunk received");
            audio.extend_from_slice(&body);
        }

        std::fs::write(out, &audio).with_context(|| format!("write '{}'", out.display()))?;
        Ok(())
    }
}

/// Split `text` into whitespace-separated chunks of at most `max_chars` characters.
///
/// Words longer than `max_chars` are hard-split.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut cur = String::new();
    let mut cur_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if word_len > max_chars {
            if !cur.is_empty() {
                chunks.push(std::mem::take(&mut cur));
                cur_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if cur.is_empty() { word_len } else { cur_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut cur));
            cur_len = 0;
        }
        if !cur.is_empty() {
            cur.push(' ');
            cur_len += 1;
        }
        cur.push_str(word);
        cur_len += word_len;
    }
    if !cur.is_empty() {
        chunks.push(cur);
    }
    chunks
}

/// Maps voice profiles to engine parameters and checks what the engine wrote.
#[derive(Clone)]
pub struct VoiceSynthesizer {
    engine: Arc<dyn SpeechEngine>,
    config: VoiceConfig,
}

impl fmt::Debug for VoiceSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceSynthesizer")
            .field("engine", &self.engine.name())
            .field("config", &self.config)
            .finish()
    }
}

impl VoiceSynthesizer {
    /// Wrap `engine` with the profile mapping in `config`.
    pub fn new(engine: Arc<dyn SpeechEngine>, config: VoiceConfig) -> Self {
        Self { engine, config }
    }

    /// Extension of the audio files the engine writes.
    pub fn file_extension(&self) -> &str {
        self.engine.file_extension()
    }

    /// Deterministic engine parameters for `profile`.
    pub fn params_for(&self, profile: VoiceProfile) -> VoiceParams {
        let tld = match profile {
            VoiceProfile::Male => &self.config.male_tld,
            VoiceProfile::Female => &self.config.female_tld,
        };
        VoiceParams {
            lang: self.config.lang.clone(),
            tld: tld.clone(),
        }
    }

    /// Synthesize `text` with `profile` into exactly one file at `out`.
    #[tracing::instrument(skip(self, text), fields(engine = self.engine.name(), out = %out.display()))]
    pub fn synthesize(
        &self,
        text: &str,
        profile: VoiceProfile,
        out: &Path,
    ) -> VoxResult<AudioAsset> {
        if text.trim().is_empty() {
            return Err(VoxError::synthesis("narration text is empty"));
        }
        let params = self.params_for(profile);
        self.engine.synthesize(text, &params, out).map_err(|e| {
            tracing::warn!(engine = self.engine.name(), error = %format!("{e:#}"), "speech engine failed");
            VoxError::synthesis("voice synthesis failed")
        })?;

        let len = std::fs::metadata(out)
            .map(|m| if m.is_file() { m.len() } else { 0 })
            .map_err(|e| {
                VoxError::synthesis(format!(
                    "engine reported success but '{}' is missing: {e}",
                    out.display()
                ))
            })?;
        if len == 0 {
            return Err(VoxError::synthesis(format!(
                "engine wrote an empty audio file '{}'",
                out.display()
            )));
        }

        let duration = if crate::media::is_ffprobe_on_path() {
            crate::media::probe::probe_audio_duration(out).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not probe narration duration");
                None
            })
        } else {
            None
        };
        tracing::info!(bytes = len, ?duration, "narration synthesized");
        Ok(AudioAsset {
            path: out.to_path_buf(),
            duration,
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/voice.rs"]
mod tests;
