use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::foundation::core::{Fps, FrameSize, duration_from_decimal_secs};
use crate::foundation::error::{VoxError, VoxResult};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Basic metadata about a source video file.
pub struct VideoSourceInfo {
    /// Source path used for probing/decoding.
    pub source_path: PathBuf,
    /// Displayed frame size in pixels, after any container rotation.
    pub size: FrameSize,
    /// Frame rate of the first video stream.
    pub fps: Fps,
    /// Container duration (falls back to the video stream duration).
    pub duration: Duration,
    /// Whether ffprobe detected at least one audio stream.
    pub has_audio: bool,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<serde_json::Value>,
}

#[derive(serde::Deserialize, Default)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Rotation in degrees from the display matrix, or the legacy `rotate` tag.
    fn rotation_degrees(&self) -> Option<f64> {
        self.side_data_list
            .iter()
            .filter_map(|sd| sd.rotation.as_ref())
            .find_map(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .or_else(|| self.tags.rotate.as_deref()?.trim().parse().ok())
    }

    /// Whether ffmpeg's autorotate swaps the stored width and height on decode.
    fn is_quarter_turn(&self) -> bool {
        self.rotation_degrees()
            .map(|deg| (deg.round() as i64).rem_euclid(180) == 90)
            .unwrap_or(false)
    }
}

#[derive(serde::Deserialize, Default)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    #[serde(default)]
    format: ProbeFormat,
}

/// Probe source video metadata through `ffprobe`.
#[tracing::instrument]
pub fn probe_video(source_path: &Path) -> VoxResult<VideoSourceInfo> {
    let stdout = run_ffprobe(source_path)?;
    let info = parse_video_probe(source_path, &stdout)?;
    tracing::debug!(size = %info.size, fps = %info.fps, duration = ?info.duration, "probed video");
    Ok(info)
}

/// Probe the duration of an audio file. `Ok(None)` when ffprobe reports no duration.
pub fn probe_audio_duration(path: &Path) -> VoxResult<Option<Duration>> {
    let stdout = run_ffprobe(path)?;
    let parsed: ProbeOut = serde_json::from_slice(&stdout)
        .map_err(|e| VoxError::transform(format!("ffprobe json parse failed: {e}")))?;
    if !parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"))
    {
        return Err(VoxError::transform(format!(
            "no audio stream found in '{}'",
            path.display()
        )));
    }
    Ok(parsed
        .format
        .duration
        .as_deref()
        .and_then(duration_from_decimal_secs))
}

fn run_ffprobe(path: &Path) -> VoxResult<Vec<u8>> {
    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| VoxError::transform(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(VoxError::transform(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(out.stdout)
}

/// Parse `ffprobe -show_streams -show_format` JSON into [`VideoSourceInfo`].
pub(crate) fn parse_video_probe(source_path: &Path, json: &[u8]) -> VoxResult<VideoSourceInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| VoxError::transform(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| VoxError::transform("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| VoxError::transform("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| VoxError::transform("missing video height from ffprobe"))?;
    let size = if video_stream.is_quarter_turn() {
        FrameSize::new(height, width)
    } else {
        FrameSize::new(width, height)
    };
    if size.is_empty() {
        return Err(VoxError::transform(format!(
            "video stream has empty dimensions {size}"
        )));
    }

    // avg_frame_rate is "0/0" for some containers; fall back to the stream's base rate.
    let fps = [&video_stream.avg_frame_rate, &video_stream.r_frame_rate]
        .into_iter()
        .flatten()
        .find_map(|r| Fps::parse_ratio(r).ok())
        .ok_or_else(|| VoxError::transform("missing or invalid video frame rate from ffprobe"))?;

    let duration = [&parsed.format.duration, &video_stream.duration]
        .into_iter()
        .flatten()
        .find_map(|d| duration_from_decimal_secs(d))
        .filter(|d| !d.is_zero())
        .ok_or_else(|| VoxError::transform("missing or zero video duration from ffprobe"))?;

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoSourceInfo {
        source_path: source_path.to_path_buf(),
        size,
        fps,
        duration,
        has_audio,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/media/probe.rs"]
mod tests;
