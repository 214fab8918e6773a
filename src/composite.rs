//! Subtitle compositing: blend a premultiplied overlay onto every frame of a video.

use std::sync::Arc;

use crate::foundation::error::{VoxError, VoxResult};
use crate::foundation::math::{mul_div255_u8, opacity_to_u8};
use crate::subtitle::SubtitleOverlay;
use crate::video::{FrameOp, VideoAsset};

/// One premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Source-over blend of `src` onto `dst`, with `src` scaled by `opacity`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let op = opacity_to_u8(opacity);
    if op == 0 || src[3] == 0 {
        return dst;
    }

    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }
    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Blend `src` over `dst` pixel by pixel. Both buffers must be RGBA8 of equal length.
///
/// Opaque straight-alpha frames are valid `dst` input: for alpha 255 both encodings agree.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> VoxResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(VoxError::transform(format!(
            "overlay of {} bytes does not match frame of {} bytes",
            src.len(),
            dst.len()
        )));
    }
    if opacity_to_u8(opacity) == 0 {
        return Ok(());
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if s[3] == 0 {
            continue;
        }
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Plan `overlay` on top of every frame of `video`.
///
/// The overlay must match the video's current frame size; duration and frame rate are unchanged.
#[tracing::instrument(skip(video, overlay), fields(size = %video.size))]
pub fn composite(video: &VideoAsset, overlay: SubtitleOverlay) -> VoxResult<VideoAsset> {
    if overlay.size != video.size {
        return Err(VoxError::transform(format!(
            "subtitle overlay is {} but the video frame is {}",
            overlay.size, video.size
        )));
    }
    if overlay.rgba8_premul.len() != overlay.size.rgba_len() {
        return Err(VoxError::transform(format!(
            "subtitle overlay buffer has {} bytes, expected {}",
            overlay.rgba8_premul.len(),
            overlay.size.rgba_len()
        )));
    }
    tracing::debug!(opacity = overlay.opacity, "compositing subtitle overlay");
    Ok(video.with_op(FrameOp::Overlay(Arc::new(overlay))))
}

#[cfg(test)]
#[path = "../tests/unit/composite.rs"]
mod tests;
