/// Convenience result type used across voxreel.
pub type VoxResult<T> = Result<T, VoxError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Every variant maps to one caller-facing failure kind; the orchestrator pairs it with the stage
/// that produced it (see [`crate::RunFailure`]).
#[derive(thiserror::Error, Debug)]
pub enum VoxError {
    /// Missing or invalid request fields. Correctable by the caller.
    #[error("input validation error: {0}")]
    InputValidation(String),

    /// The inbound video could not be persisted into the workspace.
    #[error("upload storage error: {0}")]
    UploadStorage(String),

    /// Voice generation failed (engine unreachable, rejected input, empty output).
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Geometry, subtitle or overlay planning failed.
    #[error("transform error: {0}")]
    Transform(String),

    /// Decode, mux/encode or output verification failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Deletion failed for a reason other than the path being absent.
    #[error("cleanup error: {0}")]
    Cleanup(String),

    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Stable, serializable name of a [`VoxError`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// [`VoxError::InputValidation`].
    InputValidation,
    /// [`VoxError::UploadStorage`].
    UploadStorage,
    /// [`VoxError::Synthesis`].
    Synthesis,
    /// [`VoxError::Transform`].
    Transform,
    /// [`VoxError::Encode`].
    Encode,
    /// [`VoxError::Cleanup`].
    Cleanup,
    /// [`VoxError::Config`].
    Config,
    /// [`VoxError::Other`].
    Internal,
}

impl VoxError {
    /// Build a [`VoxError::InputValidation`] value.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputValidation(msg.into())
    }

    /// Build a [`VoxError::UploadStorage`] value.
    pub fn upload(msg: impl Into<String>) -> Self {
        Self::UploadStorage(msg.into())
    }

    /// Build a [`VoxError::Synthesis`] value.
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis(msg.into())
    }

    /// Build a [`VoxError::Transform`] value.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    /// Build a [`VoxError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`VoxError::Cleanup`] value.
    pub fn cleanup(msg: impl Into<String>) -> Self {
        Self::Cleanup(msg.into())
    }

    /// Build a [`VoxError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Variant name, for structured reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputValidation(_) => ErrorKind::InputValidation,
            Self::UploadStorage(_) => ErrorKind::UploadStorage,
            Self::Synthesis(_) => ErrorKind::Synthesis,
            Self::Transform(_) => ErrorKind::Transform,
            Self::Encode(_) => ErrorKind::Encode,
            Self::Cleanup(_) => ErrorKind::Cleanup,
            Self::Config(_) => ErrorKind::Config,
            Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Returns `true` for errors the caller can fix by changing the request.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InputValidation(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
