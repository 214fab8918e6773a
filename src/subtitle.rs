//! Subtitle rendering: lay out one line of text with Parley and rasterize it with `vello_cpu` into
//! a frame-sized, premultiplied RGBA8 overlay anchored at the bottom center.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::SubtitleStyle;
use crate::foundation::core::FrameSize;
use crate::foundation::error::{VoxError, VoxResult};

/// Pixel rectangle covered by the laid-out text, clipped to the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextBox {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A static, frame-sized subtitle layer.
#[derive(Clone, Debug)]
pub struct SubtitleOverlay {
    /// Overlay size; always equal to the frame it is blended onto.
    pub size: FrameSize,
    /// Premultiplied RGBA8 pixels, `size.rgba_len()` bytes.
    pub rgba8_premul: Arc<Vec<u8>>,
    /// Layer opacity applied while blending.
    pub opacity: f32,
    /// Where the text landed, or `None` for a blank overlay.
    pub text_box: Option<TextBox>,
}

impl SubtitleOverlay {
    /// A fully transparent overlay.
    pub fn transparent(size: FrameSize, opacity: f32) -> Self {
        Self {
            size,
            rgba8_premul: Arc::new(vec![0u8; size.rgba_len()]),
            opacity,
            text_box: None,
        }
    }

    /// Wrap pre-rendered premultiplied pixels.
    pub fn from_rgba8_premul(size: FrameSize, pixels: Vec<u8>, opacity: f32) -> VoxResult<Self> {
        if pixels.len() != size.rgba_len() {
            return Err(VoxError::transform(format!(
                "overlay buffer has {} bytes, expected {} for {size}",
                pixels.len(),
                size.rgba_len()
            )));
        }
        Ok(Self {
            size,
            rgba8_premul: Arc::new(pixels),
            opacity,
            text_box: None,
        })
    }

    /// Whether any pixel is non-transparent.
    pub fn is_blank(&self) -> bool {
        self.rgba8_premul.chunks_exact(4).all(|p| p[3] == 0)
    }

    /// Write the overlay as a straight-alpha PNG (debug aid).
    pub fn save_png(&self, path: &Path) -> VoxResult<()> {
        let mut straight = self.rgba8_premul.to_vec();
        for px in straight.chunks_exact_mut(4) {
            let a = u32::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        image::save_buffer_with_format(
            path,
            &straight,
            self.size.width,
            self.size.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| {
            VoxError::transform(format!(
                "failed to write overlay png '{}': {e}",
                path.display()
            ))
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Builds Parley layouts from raw font bytes.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl TextLayoutEngine {
    pub(crate) fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape `text` as a single unwrapped line.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        brush: TextBrushRgba8,
    ) -> VoxResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(VoxError::transform("font size must be finite and > 0"));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| VoxError::transform("font data contains no usable font family"))?;
        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| VoxError::transform("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Where the subtitle font came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FontOrigin {
    /// The configured font file.
    Configured(PathBuf),
    /// A system font family found through fontdb.
    System(String),
}

#[derive(Clone)]
struct ResolvedFont {
    origin: FontOrigin,
    bytes: Arc<Vec<u8>>,
    index: u32,
}

const PREFERRED_FAMILIES: &[&str] = &["DejaVu Sans", "Liberation Sans", "Noto Sans", "Arial"];

fn resolve_font(configured: Option<&Path>) -> Option<ResolvedFont> {
    if let Some(path) = configured {
        match std::fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => {
                return Some(ResolvedFont {
                    origin: FontOrigin::Configured(path.to_path_buf()),
                    bytes: Arc::new(bytes),
                    index: 0,
                });
            }
            Ok(_) => tracing::warn!(path = %path.display(), "configured font is empty, falling back"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "configured font unreadable, falling back")
            }
        }
    }
    system_font()
}

fn system_font() -> Option<ResolvedFont> {
    use usvg::fontdb::{Database, Family, Query, Stretch, Style, Weight};

    let mut db = Database::new();
    db.load_system_fonts();

    let query = |family: Family<'_>| {
        db.query(&Query {
            families: &[family],
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        })
    };
    let id = PREFERRED_FAMILIES
        .iter()
        .find_map(|&name| query(Family::Name(name)))
        .or_else(|| query(Family::SansSerif))
        .or_else(|| db.faces().next().map(|f| f.id))?;

    let family = db
        .face(id)
        .and_then(|f| f.families.first().map(|(name, _)| name.clone()))
        .unwrap_or_default();
    let (bytes, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
    if bytes.is_empty() {
        return None;
    }
    Some(ResolvedFont {
        origin: FontOrigin::System(family),
        bytes: Arc::new(bytes),
        index,
    })
}

/// Renders subtitle text into [`SubtitleOverlay`]s with a fixed style.
///
/// The font is resolved once: the configured file if readable, else a system sans-serif face.
pub struct SubtitleRenderer {
    style: SubtitleStyle,
    font: Option<ResolvedFont>,
}

impl std::fmt::Debug for SubtitleRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleRenderer")
            .field("style", &self.style)
            .field("font", &self.font_origin())
            .finish()
    }
}

impl SubtitleRenderer {
    /// Resolve the font for `style`. Never fails; a missing font surfaces at render time.
    pub fn new(style: SubtitleStyle) -> Self {
        let font = resolve_font(style.font_path.as_deref());
        match font.as_ref() {
            Some(f) => tracing::debug!(origin = ?f.origin, "subtitle font resolved"),
            None => tracing::warn!("no subtitle font available"),
        }
        Self { style, font }
    }

    /// Style used for every overlay.
    pub fn style(&self) -> &SubtitleStyle {
        &self.style
    }

    /// Origin of the resolved font, if any.
    pub fn font_origin(&self) -> Option<&FontOrigin> {
        self.font.as_ref().map(|f| &f.origin)
    }

    /// Render `text` as a single centered line `bottom_margin_px` above the bottom of a `frame`.
    ///
    /// Blank text yields a transparent overlay. Text wider than the frame is not wrapped and is
    /// clipped at the frame edges. Rendering is deterministic for a given text, style and font.
    #[tracing::instrument(skip(self, text), fields(chars = text.chars().count()))]
    pub fn render(&self, text: &str, frame: FrameSize) -> VoxResult<SubtitleOverlay> {
        if frame.is_empty() {
            return Err(VoxError::transform(format!(
                "cannot render subtitles into an empty frame ({frame})"
            )));
        }
        let w: u16 = frame
            .width
            .try_into()
            .map_err(|_| VoxError::transform(format!("frame width exceeds u16: {frame}")))?;
        let h: u16 = frame
            .height
            .try_into()
            .map_err(|_| VoxError::transform(format!("frame height exceeds u16: {frame}")))?;

        if text.trim().is_empty() {
            return Ok(SubtitleOverlay::transparent(frame, self.style.opacity));
        }
        let font = self.font.as_ref().ok_or_else(|| {
            VoxError::transform("no subtitle font available (configured font unreadable and no system fonts)")
        })?;

        let [r, g, b, a] = self.style.color;
        let layout = TextLayoutEngine::new().layout_line(
            text,
            &font.bytes,
            self.style.font_size_px,
            TextBrushRgba8 { r, g, b, a },
        )?;

        let text_w = f64::from(layout.width());
        let text_h = f64::from(layout.height());
        let x = ((f64::from(frame.width) - text_w) / 2.0).round();
        let y = (f64::from(frame.height) - f64::from(self.style.bottom_margin_px) - text_h).round();

        let font_data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font.bytes.to_vec()),
            font.index,
        );
        let mut ctx = vello_cpu::RenderContext::new(w, h);
        ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font_data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);

        Ok(SubtitleOverlay {
            size: frame,
            rgba8_premul: Arc::new(pixmap.data_as_u8_slice().to_vec()),
            opacity: self.style.opacity,
            text_box: clip_box(frame, x, y, text_w, text_h),
        })
    }
}

fn clip_box(frame: FrameSize, x: f64, y: f64, w: f64, h: f64) -> Option<TextBox> {
    let x0 = x.max(0.0);
    let y0 = y.max(0.0);
    let x1 = (x + w).ceil().min(f64::from(frame.width));
    let y1 = (y + h).ceil().min(f64::from(frame.height));
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(TextBox {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

#[cfg(test)]
#[path = "../tests/unit/subtitle.rs"]
mod tests;
