//! Inbound narration requests and their validation.

use std::path::PathBuf;

use crate::foundation::error::{VoxError, VoxResult};
use crate::voice::VoiceProfile;

/// A request as received: every field may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(default)]
pub struct NarrationRequest {
    /// Source video file.
    pub video: Option<PathBuf>,
    /// Narration and subtitle text.
    pub text: Option<String>,
    /// `male` or `female`.
    pub gender: Option<String>,
}

/// A request with every field present and well-formed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub video: PathBuf,
    pub text: String,
    pub profile: VoiceProfile,
}

impl NarrationRequest {
    /// Check presence of each field in order: video, text, gender. Performs no filesystem I/O.
    pub fn validate(&self) -> VoxResult<ValidatedRequest> {
        let video = self
            .video
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| VoxError::input("no video file provided"))?;
        let text = self
            .text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| VoxError::input("subtitle text is required"))?;
        let gender = self
            .gender
            .as_deref()
            .filter(|g| !g.trim().is_empty())
            .ok_or_else(|| VoxError::input("gender is required"))?;
        let profile: VoiceProfile = gender.parse()?;

        Ok(ValidatedRequest {
            video: video.clone(),
            text: text.to_string(),
            profile,
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/request.rs"]
mod tests;
