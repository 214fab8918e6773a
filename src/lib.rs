//! voxreel turns a source video, a line of narration text and a narrator voice into a portrait
//! (1080x1920) MP4 with synthesized narration and a burned-in subtitle.
//!
//! The public API is pipeline-oriented:
//!
//! - Build a [`PipelineConfig`] (or load one from JSON)
//! - Create a [`Pipeline`] with a [`SpeechEngine`]
//! - [`Pipeline::run`] a [`NarrationRequest`] and get a [`RunReport`] or a typed [`RunFailure`]
#![forbid(unsafe_code)]

mod foundation;

pub mod composite;
pub mod config;
pub mod geometry;
pub mod media;
pub mod mux;
pub mod pipeline;
pub mod request;
pub mod subtitle;
pub mod video;
pub mod voice;
pub mod workspace;

pub use crate::foundation::core::{Fps, FrameSize, duration_from_decimal_secs};
pub use crate::foundation::error::{ErrorKind, VoxError, VoxResult};

pub use crate::config::{EncodeProfile, NarrowFramePolicy, PipelineConfig, SubtitleStyle, VoiceConfig};
pub use crate::mux::CancelToken;
pub use crate::pipeline::{Pipeline, RunFailure, RunReport, RunState, Stage, StageOutcome};
pub use crate::request::{NarrationRequest, ValidatedRequest};
pub use crate::subtitle::{FontOrigin, SubtitleOverlay, SubtitleRenderer, TextBox};
pub use crate::video::{AudioAsset, FrameOp, OutputArtifact, VideoAsset};
pub use crate::voice::{GoogleTts, SpeechEngine, VoiceParams, VoiceProfile, VoiceSynthesizer};
pub use crate::workspace::{CleanupReport, RunId, Workspace};
