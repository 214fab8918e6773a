use super::*;
use crate::config::NarrowFramePolicy;
use crate::geometry::plan_portrait;

fn source(size: FrameSize) -> VideoSourceInfo {
    VideoSourceInfo {
        source_path: PathBuf::from("clip.mp4"),
        size,
        fps: Fps::new(10, 1).unwrap(),
        duration: Duration::from_millis(2_500),
        has_audio: false,
    }
}

#[test]
fn frame_count_follows_duration_and_fps() {
    let v = VideoAsset::from_source(source(FrameSize::new(4, 4)));
    assert_eq!(v.frame_count(), 25);
    assert_eq!(v.path, PathBuf::from("clip.mp4"));
    assert!(v.ops().is_empty());
}

#[test]
fn process_frame_runs_reframe_then_overlay() {
    let src = FrameSize::new(8, 4);
    let target = FrameSize::new(2, 4);
    let v = VideoAsset::from_source(source(src));
    let plan = plan_portrait(src, target, NarrowFramePolicy::default()).unwrap();
    let v = v.with_op(FrameOp::Reframe(plan));
    assert_eq!(v.size, target);

    // Overlay covers only the top-left pixel with opaque white.
    let mut px = vec![0u8; target.rgba_len()];
    px[..4].copy_from_slice(&[255, 255, 255, 255]);
    let overlay = SubtitleOverlay::from_rgba8_premul(target, px, 1.0).unwrap();
    let v = v.with_op(FrameOp::Overlay(Arc::new(overlay)));

    let frame = [50u8, 60, 70, 255].repeat(src.width as usize * src.height as usize);
    let out = v.process_frame(frame).unwrap();
    assert_eq!(out.len(), target.rgba_len());
    assert_eq!(&out[..4], &[255, 255, 255, 255]);
    assert_eq!(&out[4..8], &[50, 60, 70, 255]);
}

#[test]
fn process_frame_rejects_wrong_source_size() {
    let v = VideoAsset::from_source(source(FrameSize::new(4, 4)));
    let err = v.process_frame(vec![0u8; 10]).unwrap_err();
    assert!(matches!(err, VoxError::Transform(_)));
}

#[test]
fn output_verify_requires_non_empty_file() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.mp4");
    assert!(matches!(
        OutputArtifact::verify(&missing).unwrap_err(),
        VoxError::Encode(_)
    ));

    let empty = dir.path().join("empty.mp4");
    std::fs::write(&empty, b"").unwrap();
    assert!(OutputArtifact::verify(&empty).is_err());

    assert!(OutputArtifact::verify(dir.path()).is_err());

    let ok = dir.path().join("ok.mp4");
    std::fs::write(&ok, b"not really an mp4").unwrap();
    let art = OutputArtifact::verify(&ok).unwrap();
    assert_eq!(art.path, ok);
    assert_eq!(art.byte_size, 17);
}
