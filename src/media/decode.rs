use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use crate::foundation::error::{VoxError, VoxResult};
use crate::media::probe::VideoSourceInfo;

/// Streams decoded frames of a source video as straight RGBA8 from a system `ffmpeg` process.
pub struct FrameDecoder {
    child: Child,
    stdout: ChildStdout,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
    frames_read: u64,
    eof: bool,
}

impl FrameDecoder {
    /// Spawn `ffmpeg` decoding the first video stream of `source`.
    pub fn spawn(source: &VideoSourceInfo) -> VoxResult<Self> {
        let frame_len = source.size.rgba_len();
        if frame_len == 0 {
            return Err(VoxError::encode(
                "decoded video frame size is zero (invalid source dimensions)",
            ));
        }

        // ffmpeg autorotates, so frames arrive at the displayed `source.size`.
        let mut child = Command::new("ffmpeg")
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(&source.source_path)
            .args([
                "-map", "0:v:0", "-an", "-f", "rawvideo", "-pix_fmt", "rgba", "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                VoxError::encode(format!("failed to run ffmpeg for video decode: {e}"))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VoxError::encode("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| VoxError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        Ok(Self {
            child,
            stdout,
            stderr_drain: Some(stderr_drain),
            frame_len,
            frames_read: 0,
            eof: false,
        })
    }

    /// Frames handed out so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame, `Ok(None)` at end of stream.
    pub fn next_frame(&mut self) -> VoxResult<Option<Vec<u8>>> {
        if self.eof {
            return Ok(None);
        }
        let mut buf = vec![0u8; self.frame_len];
        let n = read_full(&mut self.stdout, &mut buf)
            .map_err(|e| VoxError::encode(format!("failed to read decoded frame: {e}")))?;
        if n == 0 {
            self.eof = true;
            return Ok(None);
        }
        if n != self.frame_len {
            self.eof = true;
            return Err(VoxError::encode(format!(
                "decoded frame {} is truncated: got {n} bytes, expected {}",
                self.frames_read, self.frame_len
            )));
        }
        self.frames_read += 1;
        Ok(Some(buf))
    }

    /// Read up to `max` frames. A short (or empty) batch means the stream ended.
    pub fn read_batch(&mut self, max: usize) -> VoxResult<Vec<Vec<u8>>> {
        let mut out = Vec::with_capacity(max);
        while out.len() < max {
            match self.next_frame()? {
                Some(f) => out.push(f),
                None => break,
            }
        }
        Ok(out)
    }

    /// Stop the decoder. When the stream was fully drained, a non-zero ffmpeg exit is an error;
    /// an early stop kills the process and ignores its status.
    pub fn finish(mut self) -> VoxResult<()> {
        if !self.eof {
            let _ = self.child.kill();
        }
        let status = self.child.wait().map_err(|e| {
            VoxError::encode(format!("failed to wait for ffmpeg decoder: {e}"))
        })?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| VoxError::encode("ffmpeg stderr drain thread panicked"))?
                .unwrap_or_default(),
            None => Vec::new(),
        };
        if self.eof && !status.success() {
            return Err(VoxError::encode(format!(
                "ffmpeg video decode exited with status {status}: {}",
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }
}

fn read_full(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "../../tests/unit/media/decode.rs"]
mod tests;
