//! Explicit pipeline configuration.
//!
//! All tunables live in [`PipelineConfig`], which is handed to [`crate::Pipeline::new`]. Every
//! field has a default, so a JSON config file only needs the keys it overrides.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::core::FrameSize;
use crate::foundation::error::{VoxError, VoxResult};

/// Top-level configuration for a [`crate::Pipeline`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Root of the artifact workspace (`uploads/`, `voices/`, `processed/` live below it).
    pub workdir: PathBuf,
    /// Delivery frame size.
    pub target: FrameSize,
    /// What to do when the height-scaled source is narrower than `target.width`.
    pub narrow_frame: NarrowFramePolicy,
    /// Subtitle styling.
    pub subtitle: SubtitleStyle,
    /// Codec constants for the delivery file.
    pub encode: EncodeProfile,
    /// Voice profile mapping and TTS client settings.
    pub voice: VoiceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("voxreel-work"),
            target: FrameSize::PORTRAIT_1080P,
            narrow_frame: NarrowFramePolicy::default(),
            subtitle: SubtitleStyle::default(),
            encode: EncodeProfile::default(),
            voice: VoiceConfig::default(),
        }
    }
}

/// Policy for sources whose height-scaled width is smaller than the target width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum NarrowFramePolicy {
    /// Center the scaled frame on a target-sized canvas filled with `fill` (RGB).
    Pad {
        /// Fill color for the side bars.
        fill: [u8; 3],
    },
    /// Fail the portrait stage with a transform error.
    Reject,
}

impl Default for NarrowFramePolicy {
    fn default() -> Self {
        Self::Pad { fill: [0, 0, 0] }
    }
}

/// Subtitle look. Position is always bottom-center.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubtitleStyle {
    /// TrueType/OpenType font file. `None` or an unreadable file falls back to a system font.
    pub font_path: Option<PathBuf>,
    /// Font size in pixels.
    pub font_size_px: f32,
    /// Text color, straight-alpha RGBA8.
    pub color: [u8; 4],
    /// Gap between the bottom of the text box and the bottom of the frame.
    pub bottom_margin_px: u32,
    /// Overlay opacity applied when blending onto frames.
    pub opacity: f32,
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            font_path: None,
            font_size_px: 40.0,
            color: [255, 255, 255, 255],
            bottom_margin_px: 50,
            opacity: 0.8,
        }
    }
}

/// Fixed delivery codec profile (H.264 + AAC in MP4 by default).
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeProfile {
    /// ffmpeg video encoder name.
    pub video_codec: String,
    /// Output pixel format.
    pub pixel_format: String,
    /// ffmpeg audio encoder name.
    pub audio_codec: String,
    /// Audio bitrate in ffmpeg notation.
    pub audio_bitrate: String,
    /// Frames decoded and processed per parallel batch.
    pub batch_frames: usize,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            batch_frames: 16,
        }
    }
}

/// Voice profile mapping and TTS client settings.
///
/// The default mapping is `Male -> en / com`, `Female -> en / com.au`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoiceConfig {
    /// Language passed to the engine.
    pub lang: String,
    /// Regional endpoint variant for the male profile.
    pub male_tld: String,
    /// Regional endpoint variant for the female profile.
    pub female_tld: String,
    /// Endpoint URL template; `{tld}` is substituted.
    pub endpoint_template: String,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            male_tld: "com".to_string(),
            female_tld: "com.au".to_string(),
            endpoint_template: "https://translate.google.{tld}/translate_tts".to_string(),
            timeout_secs: 30,
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file.
    pub fn from_path(path: &Path) -> VoxResult<Self> {
        let f = std::fs::File::open(path)
            .with_context(|| format!("open config '{}'", path.display()))?;
        let cfg = Self::from_reader(std::io::BufReader::new(f))?;
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(cfg)
    }

    /// Parse and validate a JSON config.
    pub fn from_reader(r: impl Read) -> VoxResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| VoxError::config(format!("config json parse failed: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Return a copy rooted at `workdir`.
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Check invariants the pipeline relies on.
    pub fn validate(&self) -> VoxResult<()> {
        if self.target.is_empty() {
            return Err(VoxError::config("target width/height must be non-zero"));
        }
        if !self.target.is_even() {
            return Err(VoxError::config(
                "target width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        // The subtitle rasterizer addresses pixels with u16.
        if self.target.width > u32::from(u16::MAX) || self.target.height > u32::from(u16::MAX) {
            return Err(VoxError::config("target width/height must fit in u16"));
        }

        let s = &self.subtitle;
        if !s.font_size_px.is_finite() || s.font_size_px <= 0.0 {
            return Err(VoxError::config("subtitle font_size_px must be finite and > 0"));
        }
        if !s.opacity.is_finite() || !(0.0..=1.0).contains(&s.opacity) {
            return Err(VoxError::config("subtitle opacity must be within [0, 1]"));
        }
        if s.bottom_margin_px >= self.target.height {
            return Err(VoxError::config(
                "subtitle bottom_margin_px must be smaller than the target height",
            ));
        }

        let e = &self.encode;
        if e.batch_frames == 0 {
            return Err(VoxError::config("encode batch_frames must be > 0"));
        }
        for (name, v) in [
            ("video_codec", &e.video_codec),
            ("pixel_format", &e.pixel_format),
            ("audio_codec", &e.audio_codec),
            ("audio_bitrate", &e.audio_bitrate),
        ] {
            if v.trim().is_empty() {
                return Err(VoxError::config(format!("encode {name} must be non-empty")));
            }
        }

        let v = &self.voice;
        if v.lang.trim().is_empty() {
            return Err(VoxError::config("voice lang must be non-empty"));
        }
        if v.male_tld.trim().is_empty() || v.female_tld.trim().is_empty() {
            return Err(VoxError::config("voice tlds must be non-empty"));
        }
        if v.male_tld == v.female_tld {
            return Err(VoxError::config(
                "male and female voice profiles must map to different engine parameters",
            ));
        }
        if !v.endpoint_template.contains("{tld}") {
            return Err(VoxError::config("voice endpoint_template must contain '{tld}'"));
        }
        if v.timeout_secs == 0 {
            return Err(VoxError::config("voice timeout_secs must be > 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
