use super::*;

#[test]
fn fps_parse_ratio_accepts_ffprobe_notation() {
    assert_eq!(Fps::parse_ratio("30000/1001").unwrap(), Fps { num: 30000, den: 1001 });
    assert_eq!(Fps::parse_ratio("25").unwrap(), Fps { num: 25, den: 1 });
    assert!(Fps::parse_ratio("0/0").is_err());
    assert!(Fps::parse_ratio("abc").is_err());
}

#[test]
fn frames_in_is_exact_for_ntsc_rates() {
    let fps = Fps::new(30000, 1001).unwrap();
    // 1001 seconds of 29.97 contain exactly 30000 frames.
    assert_eq!(fps.frames_in(Duration::from_secs(1001)), 30000);
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.frames_in(Duration::from_secs(5)), 150);
    assert_eq!(fps.frames_in(Duration::from_millis(33)), 0);
}

#[test]
fn decimal_seconds_parse_without_drift() {
    assert_eq!(
        duration_from_decimal_secs("5.000000"),
        Some(Duration::from_secs(5))
    );
    assert_eq!(
        duration_from_decimal_secs("0.033367"),
        Some(Duration::from_nanos(33_367_000))
    );
    assert_eq!(
        duration_from_decimal_secs("1.1234567891"),
        Some(Duration::new(1, 123_456_789))
    );
    assert_eq!(duration_from_decimal_secs(".5"), Some(Duration::from_millis(500)));
    assert_eq!(duration_from_decimal_secs(""), None);
    assert_eq!(duration_from_decimal_secs("-1.0"), None);
    assert_eq!(duration_from_decimal_secs("N/A"), None);
}

#[test]
fn ffmpeg_duration_format_keeps_nanos() {
    assert_eq!(
        duration_to_ffmpeg_secs(Duration::new(5, 5_000_000)),
        "5.005000000"
    );
}

#[test]
fn frame_size_helpers() {
    let s = FrameSize::PORTRAIT_1080P;
    assert!(s.is_even());
    assert!(!s.is_empty());
    assert_eq!(s.rgba_len(), 1080 * 1920 * 4);
    assert_eq!(s.to_string(), "1080x1920");
    assert!(FrameSize::new(0, 10).is_empty());
    assert!(!FrameSize::new(11, 10).is_even());
}
