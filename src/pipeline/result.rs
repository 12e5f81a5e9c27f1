//! Caller-facing result of one run.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::gate::Outcome;
use crate::pipeline::state::StateRecord;
use crate::story::StructuredDocument;

/// Which executor produced the final state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionPath {
    Graph,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub completed_stages: Vec<String>,
    pub errors: Vec<String>,
    pub stage_durations_ms: BTreeMap<String, u64>,
    pub raw_confidence: Option<f32>,
    /// Inference time reported by the recognition engine, a subset of the
    /// `recognition` entry in `stage_durations_ms`.
    pub recognition_engine_ms: Option<u64>,
    pub removed_artifacts: Vec<String>,
    /// Why the graph engine was abandoned, when the fallback ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResult {
    /// `true` iff no error was recorded during the run.
    pub success: bool,
    pub session_id: Uuid,
    /// Gate classification; absent on the fallback path.
    pub outcome: Option<Outcome>,
    pub execution_path: ExecutionPath,
    pub raw_output: String,
    pub cleaned_output: String,
    pub structured_output: Option<StructuredDocument>,
    pub tags: Vec<String>,
    pub diagnostics: Diagnostics,
    /// All recorded errors joined with `"; "`.
    pub error_message: Option<String>,
}

impl ProcessingResult {
    /// Project a terminal State Record into a result.
    pub fn assemble(
        state: StateRecord,
        outcome: Option<Outcome>,
        execution_path: ExecutionPath,
    ) -> Self {
        let parts = state.into_parts();
        let success = parts.errors.is_empty();
        let error_message = (!success).then(|| parts.errors.join("; "));

        Self {
            success,
            session_id: parts.session_id,
            outcome,
            execution_path,
            raw_output: parts.raw_output.unwrap_or_default(),
            cleaned_output: parts.cleaned_output.unwrap_or_default(),
            structured_output: parts.structured_output,
            tags: parts.tags,
            diagnostics: Diagnostics {
                completed_stages: parts.completed_stages,
                errors: parts.errors,
                stage_durations_ms: parts
                    .stage_durations
                    .into_iter()
                    .map(|(stage, d)| (stage, d.as_millis() as u64))
                    .collect(),
                raw_confidence: parts.raw_confidence,
                recognition_engine_ms: parts.recognition_elapsed.map(|d| d.as_millis() as u64),
                removed_artifacts: parts.removed_artifacts,
                engine_error: None,
            },
            error_message,
        }
    }

    pub fn with_engine_error(mut self, error: impl Into<String>) -> Self {
        self.diagnostics.engine_error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::pipeline::state::{PartialUpdate, Stage};

    fn finished_state(errors: &[&str]) -> StateRecord {
        let mut state = StateRecord::new("memo.wav");
        state.apply(PartialUpdate {
            raw_output: Some("um hello there friends".into()),
            raw_confidence: Some(0.75),
            cleaned_output: Some("Hello there, friends.".into()),
            removed_artifacts: Some(vec!["um".into()]),
            tags: Some(vec!["#hello".into()]),
            errors: errors.iter().map(|e| e.to_string()).collect(),
            ..PartialUpdate::for_stage(Stage::Recognition, Duration::from_millis(1500))
        });
        state
    }

    #[test]
    fn clean_state_is_success() {
        let state = finished_state(&[]);
        let session = state.session_id();
        let result = ProcessingResult::assemble(state, Some(Outcome::Success), ExecutionPath::Graph);

        assert!(result.success);
        assert_eq!(result.session_id, session);
        assert!(result.error_message.is_none());
        assert_eq!(result.cleaned_output, "Hello there, friends.");
        assert_eq!(result.diagnostics.stage_durations_ms["recognition"], 1500);
        assert_eq!(result.diagnostics.removed_artifacts, ["um"]);
    }

    #[test]
    fn errors_are_joined_in_order() {
        let result = ProcessingResult::assemble(
            finished_state(&["cleanup failed: timeout", "tagging failed: empty"]),
            Some(Outcome::Failed),
            ExecutionPath::Graph,
        );
        assert!(!result.success);
        assert_eq!(
            result.error_message.as_deref(),
            Some("cleanup failed: timeout; tagging failed: empty")
        );
    }

    #[test]
    fn missing_outputs_become_empty() {
        let result = ProcessingResult::assemble(
            StateRecord::new("memo.wav"),
            None,
            ExecutionPath::Fallback,
        );
        assert_eq!(result.raw_output, "");
        assert!(result.tags.is_empty());
        assert!(result.structured_output.is_none());
    }

    #[test]
    fn serialises_to_json() {
        let result = ProcessingResult::assemble(
            finished_state(&[]),
            Some(Outcome::InsufficientContent),
            ExecutionPath::Fallback,
        )
        .with_engine_error("recursion limit of 25 steps exceeded");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "insufficient-content");
        assert_eq!(json["execution_path"], "fallback");
        assert_eq!(json["tags"][0], "#hello");
        assert_eq!(
            json["diagnostics"]["engine_error"],
            "recursion limit of 25 steps exceeded"
        );
    }

    #[test]
    fn engine_error_is_omitted_when_absent() {
        let result =
            ProcessingResult::assemble(finished_state(&[]), Some(Outcome::Success), ExecutionPath::Graph);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["diagnostics"].get("engine_error").is_none());
    }
}
