//! Run-scoped artifact naming and storage.
//!
//! Layout under the workspace root:
//!
//! - `uploads/uploaded_video_<run>.<ext>`
//! - `voices/voice_<run>.<ext>`
//! - `processed/output_video_<run>.mp4`

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::foundation::error::{VoxError, VoxResult};

static RUN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier unique to one pipeline run.
///
/// Wall-clock nanoseconds, process id and a process-wide counter, so ids never repeat within a
/// process and are practically unique across processes sharing a workspace.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(String);

impl RunId {
    /// Allocate a fresh id.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let seq = RUN_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{nanos:x}-{:x}-{seq:x}", std::process::id()))
    }

    /// The id as used in file names.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl serde::Serialize for RunId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Outcome of [`Workspace::cleanup`].
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct CleanupReport {
    /// Paths that existed and were deleted.
    pub removed: Vec<PathBuf>,
    /// Paths that were already gone.
    pub absent: Vec<PathBuf>,
}

/// Directory tree holding uploads, narration audio and outputs.
#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Workspace rooted at `root`. Nothing is created until [`Workspace::ensure_dirs`].
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    pub fn voices_dir(&self) -> PathBuf {
        self.root.join("voices")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    /// Create the workspace directories.
    pub fn ensure_dirs(&self) -> VoxResult<()> {
        for dir in [self.uploads_dir(), self.voices_dir(), self.processed_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                VoxError::upload(format!(
                    "failed to create workspace directory '{}': {e}",
                    dir.display()
                ))
            })?;
        }
        Ok(())
    }

    /// Where the upload for `run` is stored; keeps the source extension (`mp4` if none).
    pub fn upload_path(&self, run: &RunId, source: &Path) -> PathBuf {
        let ext = source
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("mp4");
        self.uploads_dir()
            .join(format!("uploaded_video_{run}.{}", ext.to_ascii_lowercase()))
    }

    pub fn voice_path(&self, run: &RunId, ext: &str) -> PathBuf {
        self.voices_dir().join(format!("voice_{run}.{ext}"))
    }

    pub fn output_path(&self, run: &RunId) -> PathBuf {
        self.processed_dir().join(format!("output_video_{run}.mp4"))
    }

    /// Copy the inbound video into the workspace under a run-scoped name.
    ///
    /// The destination is created exclusively; an existing file is an error, never overwritten.
    #[tracing::instrument(skip(self), fields(run = %run))]
    pub fn store_upload(&self, run: &RunId, source: &Path) -> VoxResult<PathBuf> {
        if !source.is_file() {
            return Err(VoxError::upload(format!(
                "video file '{}' does not exist or is not a file",
                source.display()
            )));
        }
        let dest = self.upload_path(run, source);
        let mut input = std::fs::File::open(source).map_err(|e| {
            VoxError::upload(format!("failed to open '{}': {e}", source.display()))
        })?;
        let mut output = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&dest)
            .map_err(|e| {
                VoxError::upload(format!("failed to create '{}': {e}", dest.display()))
            })?;
        let bytes = std::io::copy(&mut input, &mut output).map_err(|e| {
            VoxError::upload(format!("failed to store upload '{}': {e}", dest.display()))
        })?;
        tracing::info!(path = %dest.display(), bytes, "upload stored");
        Ok(dest)
    }

    /// Delete `paths`. Already-absent paths are not an error, so cleanup is idempotent.
    pub fn cleanup<P: AsRef<Path>>(paths: &[P]) -> VoxResult<CleanupReport> {
        let mut report = CleanupReport::default();
        for path in paths {
            let path = path.as_ref();
            match std::fs::remove_file(path) {
                Ok(()) => report.removed.push(path.to_path_buf()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    report.absent.push(path.to_path_buf())
                }
                Err(e) => {
                    return Err(VoxError::cleanup(format!(
                        "failed to delete '{}': {e}",
                        path.display()
                    )));
                }
            }
        }
        tracing::debug!(
            removed = report.removed.len(),
            absent = report.absent.len(),
            "cleanup done"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "../tests/unit/workspace.rs"]
mod tests;
