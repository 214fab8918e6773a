use super::*;

const FRAME: FrameSize = FrameSize::new(320, 240);

fn style() -> SubtitleStyle {
    SubtitleStyle {
        font_size_px: 24.0,
        bottom_margin_px: 20,
        ..SubtitleStyle::default()
    }
}

/// Renderer with a usable font, or `None` on machines without any fonts.
fn renderer() -> Option<SubtitleRenderer> {
    let r = SubtitleRenderer::new(style());
    if r.font_origin().is_none() {
        eprintln!("skipping: no fonts available");
        return None;
    }
    Some(r)
}

fn alpha_at(o: &SubtitleOverlay, x: u32, y: u32) -> u8 {
    o.rgba8_premul[((y * o.size.width + x) * 4 + 3) as usize]
}

#[test]
fn blank_text_gives_transparent_overlay() {
    let r = SubtitleRenderer::new(style());
    let o = r.render("  \t ", FRAME).unwrap();
    assert_eq!(o.size, FRAME);
    assert_eq!(o.rgba8_premul.len(), FRAME.rgba_len());
    assert!(o.is_blank());
    assert!(o.text_box.is_none());
}

#[test]
fn empty_frame_is_rejected() {
    let r = SubtitleRenderer::new(style());
    let err = r.render("hi", FrameSize::new(0, 10)).unwrap_err();
    assert!(matches!(err, VoxError::Transform(_)));
}

#[test]
fn text_lands_bottom_center() {
    let Some(r) = renderer() else { return };
    let o = r.render("Hello World", FRAME).unwrap();
    assert_eq!(o.size, FRAME);
    assert!(!o.is_blank());
    assert_eq!(o.opacity, style().opacity);

    let tb = o.text_box.unwrap();
    let center = tb.x + tb.width / 2;
    assert!(center.abs_diff(FRAME.width / 2) <= 2, "center {center}");
    assert!(tb.y + tb.height <= FRAME.height - 20 + 1);

    // Nothing drawn in the top half of the frame.
    for y in 0..FRAME.height / 2 {
        for x in 0..FRAME.width {
            assert_eq!(alpha_at(&o, x, y), 0, "stray pixel at ({x},{y})");
        }
    }
    let mut covered = 0;
    for y in tb.y..tb.y + tb.height {
        for x in tb.x..tb.x + tb.width {
            if alpha_at(&o, x, y) > 0 {
                covered += 1;
            }
        }
    }
    assert!(covered > 0);
}

/// Bounding box `(x0, y0, x1, y1)` of every pixel with non-zero alpha.
fn ink_bounds(o: &SubtitleOverlay) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..o.size.height {
        for x in 0..o.size.width {
            if alpha_at(o, x, y) == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    bounds
}

#[test]
fn glyphs_spread_across_the_line_inside_the_text_box() {
    let Some(r) = renderer() else { return };
    let o = r.render("Hello World", FRAME).unwrap();
    let tb = o.text_box.unwrap();
    let (x0, y0, x1, y1) = ink_bounds(&o).unwrap();

    // Glyphs advance along the line instead of stacking at the origin.
    let ink_w = x1 - x0 + 1;
    assert!(ink_w * 10 >= tb.width * 8, "ink {ink_w}px wide in a {}px box", tb.width);
    let ink_center = (x0 + x1) / 2;
    assert!(ink_center.abs_diff(FRAME.width / 2) <= 4, "ink center {ink_center}");

    // Every drawn pixel sits within the measured box (1px antialiasing slack).
    assert!(x0 + 1 >= tb.x && x1 <= tb.x + tb.width, "x {x0}..{x1} vs {tb:?}");
    assert!(y0 + 1 >= tb.y && y1 <= tb.y + tb.height, "y {y0}..{y1} vs {tb:?}");
}

#[test]
fn rendering_is_deterministic() {
    let Some(r) = renderer() else { return };
    let a = r.render("Hello World", FRAME).unwrap();
    let b = r.render("Hello World", FRAME).unwrap();
    assert_eq!(a.rgba8_premul, b.rgba8_premul);
    assert_eq!(a.text_box, b.text_box);
}

#[test]
fn long_text_is_clipped_not_wrapped() {
    let Some(r) = renderer() else { return };
    let text = "a very long subtitle line that cannot possibly fit in a tiny frame";
    let o = r.render(text, FRAME).unwrap();
    let tb = o.text_box.unwrap();
    assert_eq!(tb.x, 0);
    assert_eq!(tb.width, FRAME.width);
    // One line only: the box is about one font size tall.
    assert!(tb.height < 24 * 2);
}

#[test]
fn unreadable_configured_font_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let r = SubtitleRenderer::new(SubtitleStyle {
        font_path: Some(dir.path().join("missing.ttf")),
        ..style()
    });
    match r.font_origin() {
        Some(origin) => assert!(matches!(origin, FontOrigin::System(_))),
        None => eprintln!("skipping: no fonts available"),
    }
}

#[test]
fn configured_font_file_is_used() {
    let Some(sys) = system_font() else {
        eprintln!("skipping: no fonts available");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subtitle.ttf");
    std::fs::write(&path, sys.bytes.as_slice()).unwrap();

    let r = SubtitleRenderer::new(SubtitleStyle {
        font_path: Some(path.clone()),
        ..style()
    });
    assert_eq!(r.font_origin(), Some(&FontOrigin::Configured(path)));
    if sys.index == 0 {
        assert!(!r.render("Hi", FRAME).unwrap().is_blank());
    }
}

#[test]
fn overlay_png_dump_round_trips_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlay.png");
    let mut px = vec![0u8; FRAME.rgba_len()];
    px[..4].copy_from_slice(&[64, 64, 64, 128]);
    let o = SubtitleOverlay::from_rgba8_premul(FRAME, px, 1.0).unwrap();
    o.save_png(&path).unwrap();

    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (FRAME.width, FRAME.height));
    // Un-premultiplied on the way out.
    assert_eq!(img.get_pixel(0, 0).0, [128, 128, 128, 128]);
}

#[test]
fn from_rgba8_premul_checks_length() {
    assert!(SubtitleOverlay::from_rgba8_premul(FRAME, vec![0; 3], 1.0).is_err());
}
