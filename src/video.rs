//! Media assets flowing between pipeline stages.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::composite::over_in_place;
use crate::foundation::core::{Fps, FrameSize};
use crate::foundation::error::{VoxError, VoxResult};
use crate::geometry::ReframePlan;
use crate::media::probe::VideoSourceInfo;
use crate::subtitle::SubtitleOverlay;

/// A per-frame operation planned by a stage and executed while encoding.
#[derive(Clone, Debug)]
pub enum FrameOp {
    /// Resize + center-crop (or pad) into the portrait frame.
    Reframe(ReframePlan),
    /// Blend a static overlay onto every frame.
    Overlay(Arc<SubtitleOverlay>),
}

impl FrameOp {
    /// Frame size produced by this op.
    pub fn output_size(&self) -> FrameSize {
        match self {
            FrameOp::Reframe(plan) => plan.target,
            FrameOp::Overlay(overlay) => overlay.size,
        }
    }
}

/// A decoded video source plus the frame operations planned on top of it.
///
/// `size` is the frame size after all planned ops. Duration and frame rate come from the source
/// and are never changed by a stage.
#[derive(Clone, Debug)]
pub struct VideoAsset {
    /// Source file.
    pub path: PathBuf,
    /// Probed source metadata.
    pub source: VideoSourceInfo,
    /// Frame size after the planned ops.
    pub size: FrameSize,
    /// Timeline duration (video is the timeline master).
    pub duration: Duration,
    /// Frame rate.
    pub fps: Fps,
    ops: Vec<FrameOp>,
}

impl VideoAsset {
    /// Wrap a probed source with no planned ops.
    pub fn from_source(source: VideoSourceInfo) -> Self {
        Self {
            path: source.source_path.clone(),
            size: source.size,
            duration: source.duration,
            fps: source.fps,
            source,
            ops: Vec::new(),
        }
    }

    /// Planned ops, in execution order.
    pub fn ops(&self) -> &[FrameOp] {
        &self.ops
    }

    /// Return a new asset with `op` appended.
    pub(crate) fn with_op(&self, op: FrameOp) -> Self {
        let mut next = self.clone();
        next.size = op.output_size();
        next.ops.push(op);
        next
    }

    /// Expected number of frames on the timeline.
    pub fn frame_count(&self) -> u64 {
        self.fps.frames_in(self.duration)
    }

    /// Run the planned ops on one decoded source frame (straight RGBA8, opaque).
    pub fn process_frame(&self, mut frame: Vec<u8>) -> VoxResult<Vec<u8>> {
        if frame.len() != self.source.size.rgba_len() {
            return Err(VoxError::transform(format!(
                "decoded frame has {} bytes, expected {} for {}",
                frame.len(),
                self.source.size.rgba_len(),
                self.source.size
            )));
        }
        for op in &self.ops {
            match op {
                FrameOp::Reframe(plan) => frame = plan.apply(&frame)?,
                FrameOp::Overlay(overlay) => {
                    over_in_place(&mut frame, &overlay.rgba8_premul, overlay.opacity)?
                }
            }
        }
        Ok(frame)
    }
}

/// Synthesized narration on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioAsset {
    /// Encoded audio file.
    pub path: PathBuf,
    /// Probed duration, when the file could be probed.
    pub duration: Option<Duration>,
}

/// The final encoded file. Only constructed for files that exist and are non-empty.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct OutputArtifact {
    /// Output path.
    pub path: PathBuf,
    /// File size in bytes, always > 0.
    pub byte_size: u64,
}

impl OutputArtifact {
    /// Check that `path` exists, is a file and is non-empty.
    pub fn verify(path: &Path) -> VoxResult<Self> {
        let meta = std::fs::metadata(path).map_err(|e| {
            VoxError::encode(format!("output '{}' is missing: {e}", path.display()))
        })?;
        if !meta.is_file() {
            return Err(VoxError::encode(format!(
                "output '{}' is not a regular file",
                path.display()
            )));
        }
        if meta.len() == 0 {
            return Err(VoxError::encode(format!(
                "output '{}' is empty",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            byte_size: meta.len(),
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/video.rs"]
mod tests;
