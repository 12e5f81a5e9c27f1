//! `VoiceWorkflow`: the `run(source) → ProcessingResult` entry point.
//!
//! ```text
//! run(source)
//!   ├─ validate source            → Err(ValidationError), nothing runs
//!   ├─ WorkflowEngine::invoke      → Ok  → assemble (path = graph)
//!   └─ on EngineError
//!        └─ FallbackExecutor       → Ok  → assemble (path = fallback)
//!                                  → Err → assemble partial state with
//!                                          both errors recorded
//! ```
//!
//! Stage failures never reach the caller as `Err`; they are part of the
//! returned [`ProcessingResult`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{AppConfig, AppPaths, WorkflowConfig};
use crate::llm::{transformer_from_config, TextTransformer};
use crate::pipeline::engine::WorkflowEngine;
use crate::pipeline::fallback::{FallbackExecutor, FallbackFailure};
use crate::pipeline::gate::QualityGate;
use crate::pipeline::graph::WorkflowGraph;
use crate::pipeline::result::{ExecutionPath, ProcessingResult};
use crate::pipeline::stages::StageRunner;
use crate::pipeline::state::{PartialUpdate, StateRecord};
use crate::stt::{SttEngine, TranscribeParams, UnavailableStt, WhisperEngine};

const BYTES_PER_MB: u64 = 1024 * 1024;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// The source reference was rejected before any stage ran.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("audio file not found: {0}")]
    NotFound(PathBuf),

    #[error("not a regular file: {0}")]
    NotAFile(PathBuf),

    #[error("cannot read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("file too large: {size_mb:.1} MB exceeds the {max_mb} MB limit")]
    TooLarge { size_mb: f64, max_mb: u64 },

    #[error("unsupported audio format {extension:?} (allowed: {allowed})")]
    UnsupportedFormat { extension: String, allowed: String },
}

// ---------------------------------------------------------------------------
// VoiceWorkflow
// ---------------------------------------------------------------------------

pub struct VoiceWorkflow {
    config: WorkflowConfig,
    stages: StageRunner,
    engine: WorkflowEngine,
}

impl VoiceWorkflow {
    /// Workflow over the standard graph with the given collaborators.
    pub fn new(
        config: &AppConfig,
        stt: Arc<dyn SttEngine>,
        transformer: Arc<dyn TextTransformer>,
    ) -> Self {
        let graph = WorkflowGraph::standard(config.workflow.retry.enabled);
        Self::with_graph(config, stt, transformer, graph)
    }

    /// Workflow over a caller-supplied graph.
    pub fn with_graph(
        config: &AppConfig,
        stt: Arc<dyn SttEngine>,
        transformer: Arc<dyn TextTransformer>,
        graph: WorkflowGraph,
    ) -> Self {
        let workflow = config.workflow.clone();
        let engine = WorkflowEngine::new(
            graph,
            QualityGate::from_config(&workflow),
            workflow.recursion_limit,
        );
        Self {
            stages: StageRunner::new(stt, transformer, config.stt.language.clone()),
            engine,
            config: workflow,
        }
    }

    /// Build both collaborators from configuration.
    ///
    /// A missing or broken Whisper model does not abort construction: the
    /// workflow gets an [`UnavailableStt`] and every run records why
    /// recognition failed.
    pub fn from_config(config: &AppConfig, paths: &AppPaths) -> Self {
        let model_path = paths.model_file(&config.stt.model);
        let params = TranscribeParams {
            use_gpu: config.stt.use_gpu,
            ..TranscribeParams::default()
        };
        let stt: Arc<dyn SttEngine> = match WhisperEngine::load(&model_path, params) {
            Ok(engine) => Arc::new(engine),
            Err(e) => {
                log::warn!("stt: {e}; recognition will fail until a model is installed");
                Arc::new(UnavailableStt {
                    model_path: model_path.display().to_string(),
                })
            }
        };
        Self::new(config, stt, transformer_from_config(&config.llm))
    }

    /// Reject sources that cannot be processed.
    pub fn validate(&self, source: &Path) -> Result<(), ValidationError> {
        let meta = match std::fs::metadata(source) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ValidationError::NotFound(source.to_path_buf()))
            }
            Err(e) => {
                return Err(ValidationError::Unreadable {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        };
        if !meta.is_file() {
            return Err(ValidationError::NotAFile(source.to_path_buf()));
        }

        let max_bytes = self.config.max_audio_size_mb.saturating_mul(BYTES_PER_MB);
        if meta.len() > max_bytes {
            return Err(ValidationError::TooLarge {
                size_mb: meta.len() as f64 / BYTES_PER_MB as f64,
                max_mb: self.config.max_audio_size_mb,
            });
        }

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !self.config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
            return Err(ValidationError::UnsupportedFormat {
                extension,
                allowed: self.config.allowed_extensions.join(", "),
            });
        }

        std::fs::File::open(source).map_err(|e| ValidationError::Unreadable {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Process one recording end to end.
    pub async fn run(
        &self,
        source_ref: impl AsRef<Path>,
    ) -> Result<ProcessingResult, ValidationError> {
        let source = source_ref.as_ref();
        self.validate(source)?;

        let state = StateRecord::new(source).with_retry_budget(self.retry_budget());
        let session_id = state.session_id();
        log::info!("pipeline[{session_id}]: processing {}", source.display());

        let engine_error = match self.engine.invoke(&self.stages, state).await {
            Ok(run) => {
                return Ok(ProcessingResult::assemble(
                    run.state,
                    Some(run.outcome),
                    ExecutionPath::Graph,
                ))
            }
            Err(e) => e,
        };

        log::error!("pipeline[{session_id}]: workflow engine failed ({engine_error}), running fallback");
        let fresh = StateRecord::with_session(source, session_id);
        let result = match FallbackExecutor::execute(&self.stages, fresh).await {
            Ok(state) => {
                log::info!("pipeline[{session_id}]: fallback completed");
                ProcessingResult::assemble(state, None, ExecutionPath::Fallback)
            }
            Err(FallbackFailure { mut state, error }) => {
                log::error!("pipeline[{session_id}]: fallback failed ({error})");
                state.apply(
                    PartialUpdate::error(format!("workflow engine: {engine_error}"))
                        .with_error(format!("fallback: {error}")),
                );
                ProcessingResult::assemble(state, None, ExecutionPath::Fallback)
            }
        };
        Ok(result.with_engine_error(engine_error.to_string()))
    }

    fn retry_budget(&self) -> u32 {
        if self.config.retry.enabled {
            self.config.retry.max_retries
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
