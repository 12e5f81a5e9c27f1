//! The four stage functions.
//!
//! Each stage reads the [`StateRecord`], calls at most one collaborator, and
//! returns a [`PartialUpdate`].  Two entry points share one implementation:
//!
//! * [`StageRunner::run`] never fails.  A collaborator error is recorded in
//!   `errors` and a substitute value keeps every output field populated.
//!   The workflow graph uses this.
//! * [`StageRunner::run_strict`] propagates the first collaborator error.
//!   The fallback path uses this.
//!
//! | Stage | Collaborator error substitute |
//! |-------|-------------------------------|
//! | recognition | [`RECOGNITION_PLACEHOLDER`], confidence `0.0` |
//! | cleanup | the raw transcript unchanged |
//! | structuring | single-section fallback document |
//! | tagging | empty tag list |

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::llm::{LlmError, PromptVariant, TextTransformer};
use crate::pipeline::state::{PartialUpdate, Stage, StateRecord};
use crate::story::{extract_hashtags, fallback_document, parse_document, removed_fillers};
use crate::stt::{SttEngine, SttError};

/// Stand-in transcript recorded when recognition fails.
pub const RECOGNITION_PLACEHOLDER: &str = "[recognition unavailable]";

// ---------------------------------------------------------------------------
// StageError
// ---------------------------------------------------------------------------

/// A collaborator failure inside one stage.
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("recognition failed: {0}")]
    Recognition(#[from] SttError),

    #[error("{stage} failed: {source}")]
    Transform { stage: Stage, source: LlmError },

    /// The blocking recognition task panicked or was cancelled.
    #[error("{stage} task aborted: {reason}")]
    Internal { stage: Stage, reason: String },
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Recognition(_) => Stage::Recognition,
            Self::Transform { stage, .. } | Self::Internal { stage, .. } => *stage,
        }
    }
}

/// What a stage produced, plus the error it absorbed, if any.
struct StageOutput {
    update: PartialUpdate,
    error: Option<StageError>,
}

impl StageOutput {
    fn ok(update: PartialUpdate) -> Self {
        Self {
            update,
            error: None,
        }
    }

    fn substituted(update: PartialUpdate, error: StageError) -> Self {
        Self {
            update,
            error: Some(error),
        }
    }
}

// ---------------------------------------------------------------------------
// StageRunner
// ---------------------------------------------------------------------------

/// Executes stages against the shared collaborators.
///
/// Cheap to clone; collaborators sit behind `Arc`s so concurrent runs can
/// share one engine and one transformer.
#[derive(Clone)]
pub struct StageRunner {
    stt: Arc<dyn SttEngine>,
    transformer: Arc<dyn TextTransformer>,
    language: String,
}

impl StageRunner {
    pub fn new(
        stt: Arc<dyn SttEngine>,
        transformer: Arc<dyn TextTransformer>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            stt,
            transformer,
            language: language.into(),
        }
    }

    /// Run `stage`, absorbing any collaborator error into the update.
    pub async fn run(&self, stage: Stage, state: &StateRecord) -> PartialUpdate {
        let StageOutput { update, error } = self.execute(stage, state).await;
        match error {
            Some(e) => {
                log::warn!("pipeline[{}]: {e}", state.session_id());
                update.with_error(e.to_string())
            }
            None => update,
        }
    }

    /// Run `stage`, returning the collaborator error instead of substituting.
    pub async fn run_strict(
        &self,
        stage: Stage,
        state: &StateRecord,
    ) -> Result<PartialUpdate, StageError> {
        let StageOutput { update, error } = self.execute(stage, state).await;
        match error {
            Some(e) => Err(e),
            None => Ok(update),
        }
    }

    async fn execute(&self, stage: Stage, state: &StateRecord) -> StageOutput {
        let started = Instant::now();
        let mut output = match stage {
            Stage::Recognition => self.recognition(state).await,
            Stage::Cleanup => self.cleanup(state).await,
            Stage::Structuring => self.structuring(state).await,
            Stage::Tagging => self.tagging(state).await,
        };

        let bookkeeping = PartialUpdate::for_stage(stage, started.elapsed());
        output.update = output.update.merge(bookkeeping);
        log::debug!(
            "pipeline[{}]: {stage} done in {:?}",
            state.session_id(),
            started.elapsed()
        );
        output
    }

    // ── recognition ─────────────────────────────────────────────────────────

    async fn recognition(&self, state: &StateRecord) -> StageOutput {
        let stt = Arc::clone(&self.stt);
        let source = state.source_ref().to_path_buf();
        let language = self.language.clone();

        let result = tokio::task::spawn_blocking(move || stt.transcribe(&source, &language)).await;

        let error = match result {
            Ok(Ok(transcript)) => {
                log::debug!(
                    "pipeline[{}]: recognised {} chars (confidence {:.2})",
                    state.session_id(),
                    transcript.text.chars().count(),
                    transcript.confidence
                );
                return StageOutput::ok(PartialUpdate {
                    raw_output: Some(transcript.text),
                    raw_confidence: Some(transcript.confidence),
                    recognition_elapsed: Some(transcript.elapsed),
                    ..PartialUpdate::default()
                });
            }
            Ok(Err(e)) => StageError::Recognition(e),
            Err(e) => StageError::Internal {
                stage: Stage::Recognition,
                reason: e.to_string(),
            },
        };

        StageOutput::substituted(
            PartialUpdate {
                raw_output: Some(RECOGNITION_PLACEHOLDER.to_string()),
                raw_confidence: Some(0.0),
                ..PartialUpdate::default()
            },
            error,
        )
    }

    // ── cleanup ─────────────────────────────────────────────────────────────

    async fn cleanup(&self, state: &StateRecord) -> StageOutput {
        let raw = state.raw_output().unwrap_or_default();
        if raw.trim().is_empty() {
            return StageOutput::ok(PartialUpdate {
                cleaned_output: Some(String::new()),
                removed_artifacts: Some(Vec::new()),
                ..PartialUpdate::default()
            });
        }

        match self.transformer.transform(raw, PromptVariant::Cleanup).await {
            Ok(reply) => {
                let cleaned = reply.trim().to_string();
                StageOutput::ok(PartialUpdate {
                    removed_artifacts: Some(removed_fillers(raw, &cleaned)),
                    cleaned_output: Some(cleaned),
                    ..PartialUpdate::default()
                })
            }
            Err(source) => StageOutput::substituted(
                PartialUpdate {
                    cleaned_output: Some(raw.to_string()),
                    removed_artifacts: Some(Vec::new()),
                    ..PartialUpdate::default()
                },
                StageError::Transform {
                    stage: Stage::Cleanup,
                    source,
                },
            ),
        }
    }

    // ── structuring ─────────────────────────────────────────────────────────

    async fn structuring(&self, state: &StateRecord) -> StageOutput {
        let cleaned = state.cleaned_output().unwrap_or_default();
        if cleaned.trim().is_empty() {
            return StageOutput::ok(PartialUpdate {
                structured_output: Some(fallback_document(cleaned)),
                ..PartialUpdate::default()
            });
        }

        match self.transformer.transform(cleaned, PromptVariant::Structure).await {
            Ok(reply) => {
                let document = parse_document(&reply).unwrap_or_else(|| {
                    log::debug!(
                        "pipeline[{}]: structured reply was not a document, using fallback",
                        state.session_id()
                    );
                    fallback_document(cleaned)
                });
                StageOutput::ok(PartialUpdate {
                    structured_output: Some(document),
                    ..PartialUpdate::default()
                })
            }
            Err(source) => StageOutput::substituted(
                PartialUpdate {
                    structured_output: Some(fallback_document(cleaned)),
                    ..PartialUpdate::default()
                },
                StageError::Transform {
                    stage: Stage::Structuring,
                    source,
                },
            ),
        }
    }

    // ── tagging ─────────────────────────────────────────────────────────────

    async fn tagging(&self, state: &StateRecord) -> StageOutput {
        let text = state
            .structured_output()
            .and_then(|doc| doc.joined_content())
            .unwrap_or_else(|| state.cleaned_output().unwrap_or_default().to_string());

        if text.trim().is_empty() {
            return StageOutput::ok(PartialUpdate {
                tags: Some(Vec::new()),
                ..PartialUpdate::default()
            });
        }

        match self.transformer.transform(&text, PromptVariant::Tags).await {
            Ok(reply) => StageOutput::ok(PartialUpdate {
                tags: Some(extract_hashtags(&reply)),
                ..PartialUpdate::default()
            }),
            Err(source) => StageOutput::substituted(
                PartialUpdate {
                    tags: Some(Vec::new()),
                    ..PartialUpdate::default()
                },
                StageError::Transform {
                    stage: Stage::Tagging,
                    source,
                },
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedTransformer;
    use crate::stt::MockSttEngine;

    fn runner(stt: MockSttEngine, llm: ScriptedTransformer) -> StageRunner {
        StageRunner::new(Arc::new(stt), Arc::new(llm), "auto")
    }

    async fn run_all(runner: &StageRunner) -> StateRecord {
        let mut state = StateRecord::new("memo.wav");
        for stage in Stage::ALL {
            let update = runner.run(stage, &state).await;
            state.apply(update);
        }
        state
    }

    const STORY_JSON: &str = r#"Here you go:
{"title": "Busan trip", "summary": "We went to Busan.",
 "sections": [{"section_title": "Arrival", "content": "We reached Busan at noon.", "key_points": []},
              {"section_title": "Beach", "content": "Then we swam.", "key_points": ["swim"]}]}"#;

    #[tokio::test]
    async fn happy_path_fills_every_output() {
        let llm = ScriptedTransformer::new()
            .reply(PromptVariant::Cleanup, "We went to Busan and swam.")
            .reply(PromptVariant::Structure, STORY_JSON)
            .reply(PromptVariant::Tags, "#busan #beach #busan");
        let state = run_all(&runner(MockSttEngine::ok("um we went to Busan uh and swam", 0.9), llm)).await;

        assert!(state.errors().is_empty());
        assert_eq!(
            state.completed_stages(),
            ["recognition", "cleanup", "structuring", "tagging"]
        );
        assert_eq!(state.raw_confidence(), Some(0.9));
        assert_eq!(state.cleaned_output(), Some("We went to Busan and swam."));
        assert_eq!(state.removed_artifacts(), ["um", "uh"]);
        assert_eq!(state.structured_output().unwrap().title, "Busan trip");
        assert_eq!(state.tags(), ["#busan", "#beach"]);
        assert_eq!(state.stage_durations().len(), 4);
    }

    #[tokio::test]
    async fn tagging_reads_joined_section_content() {
        let llm = Arc::new(
            ScriptedTransformer::new()
                .reply(PromptVariant::Structure, STORY_JSON)
                .reply(PromptVariant::Tags, "#x"),
        );
        let runner = StageRunner::new(
            Arc::new(MockSttEngine::ok("we went to Busan", 0.9)),
            llm.clone(),
            "auto",
        );
        let mut state = StateRecord::new("memo.wav");
        for stage in [Stage::Recognition, Stage::Cleanup, Stage::Structuring] {
            let update = runner.run(stage, &state).await;
            state.apply(update);
        }
        let tagging = runner.run(Stage::Tagging, &state).await;
        assert_eq!(tagging.tags.as_deref(), Some(&["#x".to_string()][..]));
        assert_eq!(
            llm.calls(),
            [PromptVariant::Cleanup, PromptVariant::Structure, PromptVariant::Tags]
        );
    }

    #[tokio::test]
    async fn recognition_keeps_engine_reported_time() {
        let stt = MockSttEngine::ok("we went to Busan", 0.9)
            .with_elapsed(std::time::Duration::from_millis(1250));
        let runner = runner(stt, ScriptedTransformer::new());

        let update = runner.run(Stage::Recognition, &StateRecord::new("memo.wav")).await;
        assert_eq!(
            update.recognition_elapsed,
            Some(std::time::Duration::from_millis(1250))
        );

        let failed = StageRunner::new(
            Arc::new(MockSttEngine::err(SttError::Transcription("boom".into()))),
            Arc::new(ScriptedTransformer::new()),
            "auto",
        );
        let update = failed.run(Stage::Recognition, &StateRecord::new("memo.wav")).await;
        assert!(update.recognition_elapsed.is_none());
    }

    #[tokio::test]
    async fn recognition_failure_substitutes_placeholder() {
        let stt = MockSttEngine::err(SttError::ModelNotFound("ggml-base.bin".into()));
        let state = run_all(&runner(stt, ScriptedTransformer::new())).await;

        assert_eq!(state.raw_output(), Some(RECOGNITION_PLACEHOLDER));
        assert_eq!(state.raw_confidence(), Some(0.0));
        assert_eq!(state.errors().len(), 1);
        assert!(state.errors()[0].starts_with("recognition"));
        assert_eq!(state.completed_stages().len(), 4);
        assert!(state.cleaned_output().is_some());
        assert!(state.structured_output().is_some());
    }

    #[tokio::test]
    async fn cleanup_failure_passes_raw_text_through() {
        let llm = ScriptedTransformer::new().fail(PromptVariant::Cleanup, LlmError::Timeout);
        let state = run_all(&runner(MockSttEngine::ok("raw words here", 0.9), llm)).await;

        assert_eq!(state.cleaned_output(), Some("raw words here"));
        assert!(state.removed_artifacts().is_empty());
        assert_eq!(state.errors(), ["cleanup failed: LLM request timed out"]);
    }

    #[tokio::test]
    async fn unparseable_structure_reply_is_not_an_error() {
        let llm = ScriptedTransformer::new()
            .reply(PromptVariant::Cleanup, "A short story about a dog.")
            .reply(PromptVariant::Structure, "Sorry, I cannot do JSON.");
        let state = run_all(&runner(MockSttEngine::ok("a dog story", 0.9), llm)).await;

        let doc = state.structured_output().unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].content, "A short story about a dog.");
        assert!(state.errors().is_empty());
    }

    #[tokio::test]
    async fn structuring_failure_records_error_and_fallback_document() {
        let llm = ScriptedTransformer::new()
            .fail(PromptVariant::Structure, LlmError::Request("connection refused".into()));
        let state = run_all(&runner(MockSttEngine::ok("a dog story", 0.9), llm)).await;

        assert_eq!(state.structured_output().unwrap().sections.len(), 1);
        assert_eq!(state.errors().len(), 1);
        assert!(state.errors()[0].starts_with("structuring"));
    }

    #[tokio::test]
    async fn tagging_failure_yields_empty_tags() {
        let llm = ScriptedTransformer::new().fail(PromptVariant::Tags, LlmError::EmptyResponse);
        let state = run_all(&runner(MockSttEngine::ok("a dog story", 0.9), llm)).await;

        assert!(state.tags().is_empty());
        assert!(state.errors()[0].starts_with("tagging"));
    }

    #[tokio::test]
    async fn blank_transcript_skips_collaborator_calls() {
        let llm = Arc::new(ScriptedTransformer::new());
        let runner = StageRunner::new(Arc::new(MockSttEngine::ok("   ", 0.9)), llm.clone(), "auto");
        let mut state = StateRecord::new("memo.wav");
        for stage in Stage::ALL {
            let update = runner.run(stage, &state).await;
            state.apply(update);
        }

        assert!(llm.calls().is_empty());
        assert_eq!(state.cleaned_output(), Some(""));
        assert!(state.tags().is_empty());
        assert!(state.errors().is_empty());
    }

    #[tokio::test]
    async fn strict_run_propagates_collaborator_error() {
        let llm = ScriptedTransformer::new().fail(PromptVariant::Cleanup, LlmError::Timeout);
        let runner = runner(MockSttEngine::ok("some words", 0.9), llm);
        let mut state = StateRecord::new("memo.wav");
        let update = runner.run_strict(Stage::Recognition, &state).await.unwrap();
        state.apply(update);

        let err = runner.run_strict(Stage::Cleanup, &state).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Cleanup);
        assert!(matches!(err, StageError::Transform { source: LlmError::Timeout, .. }));
    }
}
