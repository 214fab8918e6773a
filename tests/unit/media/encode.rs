use super::*;

fn cfg(size: FrameSize, audio: Option<&str>) -> SinkConfig {
    SinkConfig {
        size,
        fps: Fps::new(30000, 1001).unwrap(),
        audio: audio.map(PathBuf::from),
        duration: Some(Duration::from_millis(5_005)),
    }
}

fn strings(args: Vec<OsString>) -> Vec<String> {
    args.into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[test]
fn args_attach_audio_as_sole_track_and_cap_duration() {
    let opts = FfmpegSinkOpts::new("out/final.mp4.partial");
    let args = strings(
        encode_args(&cfg(FrameSize::new(1080, 1920), Some("voice.mp3")), &opts).unwrap(),
    );

    assert_eq!(args.first().map(String::as_str), Some("-y"));
    assert_eq!(value_after(&args, "-s"), Some("1080x1920"));
    assert_eq!(value_after(&args, "-r"), Some("30000/1001"));
    assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
    assert_eq!(value_after(&args, "-pix_fmt"), Some("rgba"));
    assert!(args.iter().any(|a| a == "yuv420p"));
    assert_eq!(value_after(&args, "-c:a"), Some("aac"));
    assert_eq!(value_after(&args, "-t"), Some("5.005000000"));
    assert_eq!(value_after(&args, "-f"), Some("rawvideo"));
    assert!(args.iter().any(|a| a == "mp4"));
    assert!(args.iter().any(|a| a == "voice.mp3"));

    let maps: Vec<&str> = args
        .iter()
        .enumerate()
        .filter(|(_, a)| *a == "-map")
        .filter_map(|(i, _)| args.get(i + 1).map(String::as_str))
        .collect();
    assert_eq!(maps, vec!["0:v:0", "1:a:0"]);
    assert_eq!(args.last().map(String::as_str), Some("out/final.mp4.partial"));
    assert!(!args.iter().any(|a| a == "-shortest"));
}

#[test]
fn args_without_audio_disable_audio() {
    let mut opts = FfmpegSinkOpts::new("x.mp4");
    opts.overwrite = false;
    let args = strings(encode_args(&cfg(FrameSize::new(64, 64), None), &opts).unwrap());
    assert_eq!(args.first().map(String::as_str), Some("-n"));
    assert!(args.iter().any(|a| a == "-an"));
    assert!(!args.iter().any(|a| a == "-c:a"));
}

#[test]
fn args_reject_odd_or_empty_sizes() {
    let opts = FfmpegSinkOpts::new("x.mp4");
    assert!(encode_args(&cfg(FrameSize::new(11, 10), None), &opts).is_err());
    assert!(encode_args(&cfg(FrameSize::new(0, 10), None), &opts).is_err());
}

#[test]
fn ffmpeg_sink_rejects_frames_before_begin() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("never.mp4"));
    let err = sink.push_frame(0, &[0u8; 16]).unwrap_err();
    assert!(err.to_string().contains("not started"));
    // abort on an idle sink is a no-op
    sink.abort();
    assert!(sink.end().is_err());
}

#[test]
fn in_memory_sink_records_frames() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(FrameSize::new(2, 2), None)).unwrap();
    sink.push_frame(0, &[1u8; 16]).unwrap();
    sink.push_frame(1, &[2u8; 16]).unwrap();
    sink.end().unwrap();
    assert!(sink.ended());
    assert_eq!(sink.frames().len(), 2);
    assert_eq!(sink.config().unwrap().size, FrameSize::new(2, 2));
}

#[test]
fn ensure_parent_dir_creates_nested_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("a").join("b").join("out.mp4");
    ensure_parent_dir(&out).unwrap();
    assert!(dir.path().join("a").join("b").is_dir());
    // bare file names have an empty parent
    ensure_parent_dir(Path::new("out.mp4")).unwrap();
}
