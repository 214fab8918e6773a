//! Run orchestration: validate, store, synthesize (concurrently with probing), reframe,
//! subtitle, composite, encode, deliver.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::composite::composite;
use crate::config::PipelineConfig;
use crate::foundation::error::{ErrorKind, VoxError, VoxResult};
use crate::geometry::to_portrait;
use crate::media::probe::probe_video;
use crate::mux::{CancelToken, finalize_on_worker, partial_path};
use crate::request::NarrationRequest;
use crate::subtitle::SubtitleRenderer;
use crate::video::{OutputArtifact, VideoAsset};
use crate::voice::{GoogleTts, SpeechEngine, VoiceSynthesizer};
use crate::workspace::{CleanupReport, RunId, Workspace};

/// Step of a run that can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    Upload,
    Synthesis,
    Probe,
    Portrait,
    Subtitle,
    Composite,
    Encode,
    Delivery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validation => "validation",
            Self::Upload => "upload",
            Self::Synthesis => "synthesis",
            Self::Probe => "probe",
            Self::Portrait => "portrait",
            Self::Subtitle => "subtitle",
            Self::Composite => "composite",
            Self::Encode => "encode",
            Self::Delivery => "delivery",
        })
    }
}

/// Lifecycle of a run. States are only ever reached in declaration order; `Failed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Received,
    VoiceSynthesized,
    PortraitConverted,
    Subtitled,
    MuxedEncoded,
    Delivered,
    Failed,
}

/// A state the run reached and the time spent getting there from the previous one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct StageOutcome {
    pub state: RunState,
    pub elapsed_ms: u64,
}

/// Successful run.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    /// Delivered output; exists and is non-empty.
    pub output: OutputArtifact,
    /// Stored upload, left for explicit cleanup.
    pub upload_path: PathBuf,
    /// Narration audio, left for explicit cleanup.
    pub voice_path: PathBuf,
    pub stages: Vec<StageOutcome>,
}

impl RunReport {
    /// Whether the run passed through `state`.
    pub fn reached(&self, state: RunState) -> bool {
        self.stages.iter().any(|s| s.state == state)
    }
}

/// Failed run: the stage that failed, its typed cause, and everything left on disk.
#[derive(Debug)]
pub struct RunFailure {
    pub run_id: RunId,
    pub stage: Stage,
    pub error: VoxError,
    pub stages: Vec<StageOutcome>,
    /// Paths the run may have created; pass them to [`Pipeline::cleanup`].
    pub artifacts: Vec<PathBuf>,
}

impl RunFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    /// Whether the run passed through `state` before failing.
    pub fn reached(&self, state: RunState) -> bool {
        self.stages.iter().any(|s| s.state == state)
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {} failed at {}: {}", self.run_id, self.stage, self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl serde::Serialize for RunFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Record<'a> {
            run_id: &'a RunId,
            stage: Stage,
            kind: ErrorKind,
            message: String,
            artifacts: &'a [PathBuf],
        }
        Record {
            run_id: &self.run_id,
            stage: self.stage,
            kind: self.kind(),
            message: self.error.to_string(),
            artifacts: &self.artifacts,
        }
        .serialize(serializer)
    }
}

struct RunTracker {
    run_id: RunId,
    mark: Instant,
    stages: Vec<StageOutcome>,
    artifacts: Vec<PathBuf>,
}

impl RunTracker {
    fn start() -> Self {
        let mut run = Self {
            run_id: RunId::generate(),
            mark: Instant::now(),
            stages: Vec::new(),
            artifacts: Vec::new(),
        };
        run.reached(RunState::Received);
        run
    }

    fn reached(&mut self, state: RunState) {
        let elapsed_ms = u64::try_from(self.mark.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.mark = Instant::now();
        tracing::debug!(run = %self.run_id, ?state, elapsed_ms, "stage reached");
        self.stages.push(StageOutcome { state, elapsed_ms });
    }

    fn check<T>(&mut self, stage: Stage, result: VoxResult<T>) -> Result<T, RunFailure> {
        result.map_err(|error| {
            tracing::error!(run = %self.run_id, %stage, kind = ?error.kind(), %error, "run failed");
            self.reached(RunState::Failed);
            RunFailure {
                run_id: self.run_id.clone(),
                stage,
                error,
                stages: std::mem::take(&mut self.stages),
                artifacts: std::mem::take(&mut self.artifacts),
            }
        })
    }
}

/// Narrated portrait video pipeline. Holds no per-run state; runs may execute concurrently.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    workspace: Workspace,
    synthesizer: VoiceSynthesizer,
    renderer: SubtitleRenderer,
}

impl Pipeline {
    /// Build a pipeline around `engine`. The config is validated first.
    pub fn new(config: PipelineConfig, engine: Arc<dyn SpeechEngine>) -> VoxResult<Self> {
        config.validate()?;
        Ok(Self {
            workspace: Workspace::new(config.workdir.clone()),
            synthesizer: VoiceSynthesizer::new(engine, config.voice.clone()),
            renderer: SubtitleRenderer::new(config.subtitle.clone()),
            config,
        })
    }

    /// Build a pipeline that narrates with Google Translate TTS.
    pub fn with_google_tts(config: PipelineConfig) -> VoxResult<Self> {
        let engine = GoogleTts::new(&config.voice)?;
        Self::new(config, Arc::new(engine))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn renderer(&self) -> &SubtitleRenderer {
        &self.renderer
    }

    /// Run one request to completion.
    pub fn run(&self, request: &NarrationRequest) -> Result<RunReport, RunFailure> {
        self.run_with_cancel(request, &CancelToken::new())
    }

    /// Run one request; `cancel` aborts the encode stage.
    pub fn run_with_cancel(
        &self,
        request: &NarrationRequest,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunFailure> {
        let mut run = RunTracker::start();
        let span = tracing::info_span!("run", run = %run.run_id);
        let _guard = span.enter();

        let req = run.check(Stage::Validation, request.validate())?;
        tracing::info!(video = %req.video.display(), profile = %req.profile, "run received");

        run.check(Stage::Upload, self.workspace.ensure_dirs())?;
        let upload_dest = self.workspace.upload_path(&run.run_id, &req.video);
        run.artifacts.push(upload_dest);
        let upload = run.check(
            Stage::Upload,
            self.workspace.store_upload(&run.run_id, &req.video),
        )?;

        let voice_path = self
            .workspace
            .voice_path(&run.run_id, self.synthesizer.file_extension());
        run.artifacts.push(voice_path.clone());
        let (voice, probe) = std::thread::scope(|s| {
            let voice = s.spawn(|| {
                self.synthesizer
                    .synthesize(&req.text, req.profile, &voice_path)
            });
            let probe = probe_video(&upload);
            let voice = voice
                .join()
                .unwrap_or_else(|_| Err(VoxError::synthesis("voice synthesis thread panicked")));
            (voice, probe)
        });
        let audio = run.check(Stage::Synthesis, voice)?;
        run.reached(RunState::VoiceSynthesized);
        let source = run.check(Stage::Probe, probe)?;

        let video = VideoAsset::from_source(source);
        let portrait = run.check(
            Stage::Portrait,
            to_portrait(&video, self.config.target, self.config.narrow_frame),
        )?;
        run.reached(RunState::PortraitConverted);

        let overlay = run.check(
            Stage::Subtitle,
            self.renderer.render(&req.text, portrait.size),
        )?;
        let composited = run.check(Stage::Composite, composite(&portrait, overlay))?;
        run.reached(RunState::Subtitled);

        let out_path = self.workspace.output_path(&run.run_id);
        run.artifacts.push(partial_path(&out_path));
        run.artifacts.push(out_path.clone());
        let encoded = run.check(
            Stage::Encode,
            finalize_on_worker(
                composited,
                audio,
                out_path,
                self.config.encode.clone(),
                cancel.clone(),
            ),
        )?;
        run.reached(RunState::MuxedEncoded);

        let output = run.check(Stage::Delivery, OutputArtifact::verify(&encoded.path))?;
        run.reached(RunState::Delivered);
        tracing::info!(output = %output.path.display(), bytes = output.byte_size, "run delivered");

        Ok(RunReport {
            run_id: run.run_id,
            output,
            upload_path: upload,
            voice_path,
            stages: run.stages,
        })
    }

    /// Delete run artifacts. Idempotent: absent paths are reported, not errors.
    pub fn cleanup<P: AsRef<Path>>(&self, paths: &[P]) -> VoxResult<CleanupReport> {
        Workspace::cleanup(paths)
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline.rs"]
mod tests;
