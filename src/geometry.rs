//! Portrait reframing: scale to the target height, then center-crop (or pad) to the target width.

use image::imageops::FilterType;

use crate::config::NarrowFramePolicy;
use crate::foundation::core::FrameSize;
use crate::foundation::error::{VoxError, VoxResult};
use crate::video::{FrameOp, VideoAsset};

/// Exact per-frame geometry of a portrait conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReframePlan {
    /// Input frame size.
    pub source: FrameSize,
    /// Size after the aspect-preserving resize; `scaled.height == target.height`.
    pub scaled: FrameSize,
    /// Output frame size.
    pub target: FrameSize,
    /// Left edge of the crop window in scaled space (0 when padding).
    pub crop_x: u32,
    /// Width of each side bar when the scaled frame is narrower than the target.
    pub pad_x: u32,
    /// Side bar color.
    pub fill: [u8; 3],
}

impl ReframePlan {
    /// Whether the scaled frame is narrower than the target and gets side bars.
    pub fn is_padded(&self) -> bool {
        self.scaled.width < self.target.width
    }

    /// Whether the plan leaves frames untouched.
    pub fn is_identity(&self) -> bool {
        self.source == self.target && self.scaled == self.target
    }

    /// Apply the plan to one straight RGBA8 frame of `source` size.
    pub fn apply(&self, src: &[u8]) -> VoxResult<Vec<u8>> {
        if self.is_identity() {
            return Ok(src.to_vec());
        }
        let img = image::RgbaImage::from_raw(self.source.width, self.source.height, src.to_vec())
            .ok_or_else(|| {
                VoxError::transform(format!(
                    "frame buffer of {} bytes does not match {}",
                    src.len(),
                    self.source
                ))
            })?;

        let scaled = if self.scaled == self.source {
            img
        } else {
            image::imageops::resize(
                &img,
                self.scaled.width,
                self.scaled.height,
                FilterType::Lanczos3,
            )
        };

        if self.is_padded() {
            let [r, g, b] = self.fill;
            let mut canvas = image::RgbaImage::from_pixel(
                self.target.width,
                self.target.height,
                image::Rgba([r, g, b, 255]),
            );
            image::imageops::replace(&mut canvas, &scaled, i64::from(self.pad_x), 0);
            return Ok(canvas.into_raw());
        }

        let cropped = image::imageops::crop_imm(
            &scaled,
            self.crop_x,
            0,
            self.target.width,
            self.target.height,
        )
        .to_image();
        Ok(cropped.into_raw())
    }
}

/// Compute the portrait geometry for a `source`-sized frame.
pub fn plan_portrait(
    source: FrameSize,
    target: FrameSize,
    policy: NarrowFramePolicy,
) -> VoxResult<ReframePlan> {
    if source.is_empty() {
        return Err(VoxError::transform(format!(
            "cannot reframe an empty source frame ({source})"
        )));
    }
    if target.is_empty() {
        return Err(VoxError::transform(format!(
            "cannot reframe into an empty target frame ({target})"
        )));
    }

    let src_w = u64::from(source.width);
    let src_h = u64::from(source.height);
    let scaled_w = ((src_w * u64::from(target.height) + src_h / 2) / src_h).max(1);
    let scaled_w = u32::try_from(scaled_w).map_err(|_| {
        VoxError::transform(format!("scaled width for {source} overflows u32"))
    })?;
    let scaled = FrameSize::new(scaled_w, target.height);

    if scaled.width >= target.width {
        return Ok(ReframePlan {
            source,
            scaled,
            target,
            crop_x: (scaled.width - target.width) / 2,
            pad_x: 0,
            fill: [0, 0, 0],
        });
    }

    match policy {
        NarrowFramePolicy::Pad { fill } => Ok(ReframePlan {
            source,
            scaled,
            target,
            crop_x: 0,
            pad_x: (target.width - scaled.width) / 2,
            fill,
        }),
        NarrowFramePolicy::Reject => Err(VoxError::transform(format!(
            "source {source} scales to {scaled}, narrower than the target width {}",
            target.width
        ))),
    }
}

/// Reframe `video` into `target`, keeping duration and frame rate.
#[tracing::instrument(skip(video), fields(source = %video.size))]
pub fn to_portrait(
    video: &VideoAsset,
    target: FrameSize,
    policy: NarrowFramePolicy,
) -> VoxResult<VideoAsset> {
    let plan = plan_portrait(video.size, target, policy)?;
    if plan.is_padded() {
        tracing::info!(scaled = %plan.scaled, pad_x = plan.pad_x, "source narrower than target, padding");
    } else {
        tracing::debug!(scaled = %plan.scaled, crop_x = plan.crop_x, "center-crop");
    }
    Ok(video.with_op(FrameOp::Reframe(plan)))
}

#[cfg(test)]
#[path = "../tests/unit/geometry.rs"]
mod tests;
