//! Final encode: run the planned frame ops over the decoded source and mux the narration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::config::EncodeProfile;
use crate::foundation::error::{VoxError, VoxResult};
use crate::media::decode::FrameDecoder;
use crate::media::encode::{FfmpegSink, FfmpegSinkOpts, FrameSink, SinkConfig};
use crate::video::{AudioAsset, OutputArtifact, VideoAsset};

/// Cooperative cancellation flag for an encode. Clones share the flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect before the next frame batch.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether any clone has requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Hidden sibling the encoder writes to before the output is renamed into place.
pub fn partial_path(out_path: &Path) -> PathBuf {
    let name = out_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.mp4".to_string());
    out_path.with_file_name(format!(".{name}.partial"))
}

/// Encode `video` with `audio` as its only audio track into `out_path`.
///
/// The output is cut to the video duration. `out_path` only ever appears complete: frames go to
/// [`partial_path`], which is verified and then renamed.
#[tracing::instrument(skip_all, fields(out = %out_path.display(), size = %video.size, frames = video.frame_count()))]
pub fn finalize(
    video: &VideoAsset,
    audio: &AudioAsset,
    out_path: &Path,
    profile: &EncodeProfile,
    cancel: &CancelToken,
) -> VoxResult<OutputArtifact> {
    let partial = partial_path(out_path);
    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: partial.clone(),
        overwrite: true,
        profile: profile.clone(),
    });
    let cfg = SinkConfig {
        size: video.size,
        fps: video.fps,
        audio: Some(audio.path.clone()),
        duration: Some(video.duration),
    };

    let mut decoder = FrameDecoder::spawn(&video.source)?;
    let pushed = match encode_frames(
        video,
        |max| decoder.read_batch(max),
        &mut sink,
        cfg,
        profile.batch_frames,
        cancel,
    ) {
        Ok(n) => n,
        Err(e) => {
            let _ = decoder.finish();
            return Err(e);
        }
    };
    decoder.finish()?;

    OutputArtifact::verify(&partial)?;
    std::fs::rename(&partial, out_path).map_err(|e| {
        VoxError::encode(format!(
            "failed to move '{}' into place at '{}': {e}",
            partial.display(),
            out_path.display()
        ))
    })?;
    let artifact = OutputArtifact::verify(out_path)?;
    tracing::info!(frames = pushed, bytes = artifact.byte_size, "encode complete");
    Ok(artifact)
}

/// Run [`finalize`] on a dedicated named thread and block until it completes.
pub fn finalize_on_worker(
    video: VideoAsset,
    audio: AudioAsset,
    out_path: PathBuf,
    profile: EncodeProfile,
    cancel: CancelToken,
) -> VoxResult<OutputArtifact> {
    let handle = std::thread::Builder::new()
        .name("voxreel-encode".to_string())
        .spawn(move || finalize(&video, &audio, &out_path, &profile, &cancel))
        .map_err(|e| VoxError::encode(format!("failed to spawn encode worker: {e}")))?;
    handle
        .join()
        .map_err(|_| VoxError::encode("encode worker panicked"))?
}

/// Pull frames in batches from `next_batch`, process each batch in parallel and push the results
/// to `sink` in timeline order. Stops after `video.frame_count()` frames or at end of stream.
///
/// Returns the number of frames pushed. On error the sink is aborted.
pub fn encode_frames<F>(
    video: &VideoAsset,
    next_batch: F,
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    batch_frames: usize,
    cancel: &CancelToken,
) -> VoxResult<u64>
where
    F: FnMut(usize) -> VoxResult<Vec<Vec<u8>>>,
{
    sink.begin(cfg)?;
    match push_frames(video, next_batch, sink, batch_frames, cancel) {
        Ok(n) => {
            sink.end()?;
            Ok(n)
        }
        Err(e) => {
            sink.abort();
            Err(e)
        }
    }
}

fn push_frames<F>(
    video: &VideoAsset,
    mut next_batch: F,
    sink: &mut dyn FrameSink,
    batch_frames: usize,
    cancel: &CancelToken,
) -> VoxResult<u64>
where
    F: FnMut(usize) -> VoxResult<Vec<Vec<u8>>>,
{
    let limit = video.frame_count().max(1);
    let batch = batch_frames.max(1);
    let mut idx = 0u64;

    while idx < limit {
        if cancel.is_cancelled() {
            tracing::warn!(pushed = idx, "encode cancelled");
            return Err(VoxError::encode("encode cancelled"));
        }
        let want = usize::try_from(limit - idx).map_or(batch, |left| left.min(batch));
        let frames = next_batch(want)?;
        if frames.is_empty() {
            break;
        }
        let stream_ended = frames.len() < want;

        let processed: Vec<Vec<u8>> = frames
            .into_par_iter()
            .map(|f| video.process_frame(f))
            .collect::<VoxResult<_>>()?;
        for frame in processed {
            sink.push_frame(idx, &frame)?;
            idx += 1;
        }
        if stream_ended {
            break;
        }
    }

    if idx == 0 {
        return Err(VoxError::encode("source video produced no frames"));
    }
    if idx < limit {
        tracing::debug!(pushed = idx, expected = limit, "source ended before the expected frame count");
    }
    Ok(idx)
}

#[cfg(test)]
#[path = "../tests/unit/mux.rs"]
mod tests;
