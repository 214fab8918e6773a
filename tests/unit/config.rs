use std::io::Cursor;

use super::*;

#[test]
fn defaults_match_delivery_contract() {
    let cfg = PipelineConfig::default();
    assert_eq!(cfg.target, FrameSize::new(1080, 1920));
    assert_eq!(cfg.subtitle.font_size_px, 40.0);
    assert_eq!(cfg.subtitle.bottom_margin_px, 50);
    assert_eq!(cfg.subtitle.opacity, 0.8);
    assert_eq!(cfg.encode.video_codec, "libx264");
    assert_eq!(cfg.encode.audio_codec, "aac");
    assert_eq!(cfg.narrow_frame, NarrowFramePolicy::Pad { fill: [0, 0, 0] });
    cfg.validate().unwrap();
}

#[test]
fn partial_json_keeps_defaults() {
    let json = r#"{
        "workdir": "/tmp/vox",
        "narrow_frame": { "policy": "reject" },
        "subtitle": { "font_size_px": 64 }
    }"#;
    let cfg = PipelineConfig::from_reader(Cursor::new(json)).unwrap();
    assert_eq!(cfg.workdir, PathBuf::from("/tmp/vox"));
    assert_eq!(cfg.narrow_frame, NarrowFramePolicy::Reject);
    assert_eq!(cfg.subtitle.font_size_px, 64.0);
    assert_eq!(cfg.subtitle.opacity, 0.8);
    assert_eq!(cfg.voice.female_tld, "com.au");
}

#[test]
fn pad_policy_parses_fill() {
    let json = r#"{ "narrow_frame": { "policy": "pad", "fill": [16, 32, 48] } }"#;
    let cfg = PipelineConfig::from_reader(Cursor::new(json)).unwrap();
    assert_eq!(cfg.narrow_frame, NarrowFramePolicy::Pad { fill: [16, 32, 48] });
}

#[test]
fn unknown_keys_are_config_errors() {
    let err = PipelineConfig::from_reader(Cursor::new(r#"{ "wrokdir": "x" }"#)).unwrap_err();
    assert!(matches!(err, VoxError::Config(_)));
}

#[test]
fn validation_catches_bad_values() {
    let mut cfg = PipelineConfig::default();
    cfg.target = FrameSize::new(1081, 1920);
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.subtitle.opacity = 1.5;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.subtitle.font_size_px = 0.0;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.encode.batch_frames = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.target = FrameSize::new(70_000, 1920);
    assert!(cfg.validate().is_err());
}

#[test]
fn identical_voice_mapping_is_rejected() {
    let mut cfg = PipelineConfig::default();
    cfg.voice.female_tld = cfg.voice.male_tld.clone();
    let err = cfg.validate().unwrap_err();
    assert!(err.to_string().contains("different engine parameters"));
}

#[test]
fn from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(&path, r#"{ "encode": { "batch_frames": 4 } }"#).unwrap();
    let cfg = PipelineConfig::from_path(&path).unwrap();
    assert_eq!(cfg.encode.batch_frames, 4);

    assert!(PipelineConfig::from_path(&dir.path().join("missing.json")).is_err());
}
