use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;

use crate::config::EncodeProfile;
use crate::foundation::core::{Fps, FrameSize, duration_to_ffmpeg_secs};
use crate::foundation::error::{VoxError, VoxResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Frame size of every pushed frame.
    pub size: FrameSize,
    /// Input frame rate.
    pub fps: Fps,
    /// Encoded audio file attached as the only audio track.
    pub audio: Option<PathBuf>,
    /// Output duration cap; the video timeline is the master.
    pub duration: Option<Duration>,
}

/// Sink contract for consuming processed frames in timeline order.
///
/// Ordering contract: `push_frame` is called with strictly increasing indices.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> VoxResult<()>;
    /// Push one straight-alpha RGBA8 frame.
    fn push_frame(&mut self, idx: u64, frame: &[u8]) -> VoxResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> VoxResult<()>;
    /// Stop without producing a complete output. Must be safe to call in any state.
    fn abort(&mut self) {}
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, Vec<u8>)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(u64, Vec<u8>)] {
        &self.frames
    }

    /// Whether `end` was called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> VoxResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &[u8]) -> VoxResult<()> {
        self.frames.push((idx, frame.to_vec()));
        Ok(())
    }

    fn end(&mut self) -> VoxResult<()> {
        self.ended = true;
        Ok(())
    }
}

/// Options for [`FfmpegSink`] output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path.
    pub out_path: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
    /// Codec constants.
    pub profile: EncodeProfile,
}

impl FfmpegSinkOpts {
    /// Create options for writing an MP4 to `out_path` with the default profile.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            profile: EncodeProfile::default(),
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw frames to stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<u64>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            last_idx: None,
        }
    }

    fn join_stderr(&mut self) -> Vec<u8> {
        self.stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .and_then(|r| r.ok())
            .unwrap_or_default()
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> VoxResult<()> {
        let args = encode_args(&cfg, &self.opts)?;

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(VoxError::encode(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if let Some(audio) = cfg.audio.as_ref()
            && !audio.is_file()
        {
            return Err(VoxError::encode(format!(
                "audio input '{}' does not exist",
                audio.display()
            )));
        }

        if !super::is_ffmpeg_on_path() {
            return Err(VoxError::encode(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VoxError::encode(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| VoxError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VoxError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(out = %self.opts.out_path.display(), size = %cfg.size, fps = %cfg.fps, "spawned ffmpeg encoder");
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &[u8]) -> VoxResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| VoxError::encode("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(VoxError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.len() != cfg.size.rgba_len() {
            return Err(VoxError::encode(format!(
                "frame size mismatch: got {} bytes, expected {} for {}",
                frame.len(),
                cfg.size.rgba_len(),
                cfg.size
            )));
        }

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(VoxError::encode("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        if let Err(e) = stdin.write_all(frame) {
            // ffmpeg closed its input early; its exit status and stderr carry the real cause.
            drop(self.stdin.take());
            let status = self.child.as_mut().and_then(|c| c.wait().ok());
            let stderr = self.join_stderr();
            self.child = None;
            return Err(VoxError::encode(format!(
                "failed to write frame {idx} to ffmpeg stdin: {e} (status {}): {}",
                status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".into()),
                String::from_utf8_lossy(&stderr).trim()
            )));
        }
        Ok(())
    }

    fn end(&mut self) -> VoxResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| VoxError::encode("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| VoxError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VoxError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| VoxError::encode(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(VoxError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = self.join_stderr();
        self.cfg = None;
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

/// Build the ffmpeg argument list for `cfg` / `opts`.
///
/// Input 0 is raw RGBA on stdin at `cfg.fps`; input 1 (optional) is the audio file. The output is
/// cut to `cfg.duration` so audio never extends the video timeline.
pub(crate) fn encode_args(cfg: &SinkConfig, opts: &FfmpegSinkOpts) -> VoxResult<Vec<OsString>> {
    if cfg.fps.num == 0 || cfg.fps.den == 0 {
        return Err(VoxError::encode("fps must be non-zero"));
    }
    if cfg.size.is_empty() {
        return Err(VoxError::encode("ffmpeg sink width/height must be non-zero"));
    }
    if !cfg.size.is_even() {
        return Err(VoxError::encode(
            "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
        ));
    }

    let p = &opts.profile;
    let mut args: Vec<OsString> = Vec::new();
    push_all(&mut args, &[if opts.overwrite { "-y" } else { "-n" }]);
    push_all(
        &mut args,
        &[
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &cfg.size.to_string(),
            // For rawvideo input, `-r` before `-i` sets the input frame rate.
            "-r",
            &cfg.fps.to_string(),
            "-i",
            "pipe:0",
        ],
    );

    if let Some(audio) = cfg.audio.as_ref() {
        args.push(OsString::from("-i"));
        args.push(audio.as_os_str().to_owned());
        push_all(
            &mut args,
            &[
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:v",
                &p.video_codec,
                "-pix_fmt",
                &p.pixel_format,
                "-c:a",
                &p.audio_codec,
                "-b:a",
                &p.audio_bitrate,
            ],
        );
    } else {
        push_all(
            &mut args,
            &["-an", "-c:v", &p.video_codec, "-pix_fmt", &p.pixel_format],
        );
    }

    if let Some(d) = cfg.duration {
        push_all(&mut args, &["-t", &duration_to_ffmpeg_secs(d)]);
    }
    push_all(&mut args, &["-movflags", "+faststart", "-f", "mp4"]);
    args.push(opts.out_path.as_os_str().to_owned());
    Ok(args)
}

fn push_all(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> VoxResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            VoxError::encode(format!(
                "failed to create output directory '{}': {e}",
                parent.display()
            ))
        })?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/media/encode.rs"]
mod tests;
