//! Quality gate: classifies a finished pass into an [`Outcome`].

use serde::Serialize;

use crate::config::{RetryConfig, WorkflowConfig};
use crate::pipeline::state::StateRecord;

/// Terminal classification of a run, or a request to redo recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    Success,
    InsufficientContent,
    Failed,
    /// Only produced when recognition retries are enabled and budget remains.
    RetryRecognition,
}

impl Outcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::InsufficientContent => "insufficient-content",
            Self::Failed => "failed",
            Self::RetryRecognition => "retry-recognition",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::RetryRecognition)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Pure function of the State Record.
///
/// Checks, in order:
/// 1. any recorded error → [`Outcome::Failed`]
/// 2. retries enabled, budget left, confidence below the floor →
///    [`Outcome::RetryRecognition`]
/// 3. trimmed cleaned text shorter than `min_content_chars` →
///    [`Outcome::InsufficientContent`]
/// 4. otherwise [`Outcome::Success`]
#[derive(Debug, Clone, PartialEq)]
pub struct QualityGate {
    min_content_chars: usize,
    retry: RetryConfig,
}

impl QualityGate {
    pub fn new(min_content_chars: usize, retry: RetryConfig) -> Self {
        Self {
            min_content_chars,
            retry,
        }
    }

    pub fn from_config(config: &WorkflowConfig) -> Self {
        Self::new(config.min_content_chars, config.retry.clone())
    }

    pub fn evaluate(&self, state: &StateRecord) -> Outcome {
        if !state.errors().is_empty() {
            return Outcome::Failed;
        }

        if self.retry.enabled && state.retry_budget() > 0 {
            let confidence = state.raw_confidence().unwrap_or(0.0);
            if confidence < self.retry.min_confidence {
                return Outcome::RetryRecognition;
            }
        }

        self.content_outcome(state)
    }

    /// Like [`evaluate`](Self::evaluate) but never asks for a retry.
    pub fn evaluate_terminal(&self, state: &StateRecord) -> Outcome {
        if !state.errors().is_empty() {
            return Outcome::Failed;
        }
        self.content_outcome(state)
    }

    fn content_outcome(&self, state: &StateRecord) -> Outcome {
        let chars = state
            .cleaned_output()
            .map(|s| s.trim().chars().count())
            .unwrap_or(0);
        if chars < self.min_content_chars {
            Outcome::InsufficientContent
        } else {
            Outcome::Success
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::from_config(&WorkflowConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::state::PartialUpdate;

    fn state_with(cleaned: &str, confidence: f32, errors: &[&str]) -> StateRecord {
        let mut state = StateRecord::new("memo.wav").with_retry_budget(1);
        state.apply(PartialUpdate {
            raw_confidence: Some(confidence),
            cleaned_output: Some(cleaned.to_string()),
            errors: errors.iter().map(|e| e.to_string()).collect(),
            ..PartialUpdate::default()
        });
        state
    }

    fn retrying_gate() -> QualityGate {
        QualityGate::new(
            10,
            RetryConfig {
                enabled: true,
                max_retries: 1,
                min_confidence: 0.3,
            },
        )
    }

    #[test]
    fn clean_long_text_is_success() {
        let gate = QualityGate::default();
        assert_eq!(
            gate.evaluate(&state_with("Hello world, this is fine.", 0.9, &[])),
            Outcome::Success
        );
    }

    #[test]
    fn short_text_is_insufficient() {
        let gate = QualityGate::default();
        assert_eq!(
            gate.evaluate(&state_with("   Hi.   ", 0.9, &[])),
            Outcome::InsufficientContent
        );
        assert_eq!(
            gate.evaluate(&state_with("", 0.9, &[])),
            Outcome::InsufficientContent
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let gate = QualityGate::default();
        // 9 chars (25 bytes), under the 10-char floor.
        assert_eq!(
            gate.evaluate(&state_with("부산에 다녀왔어요", 0.9, &[])),
            Outcome::InsufficientContent
        );
    }

    #[test]
    fn errors_dominate_everything() {
        let gate = retrying_gate();
        assert_eq!(
            gate.evaluate(&state_with("Plenty of content here.", 0.1, &["cleanup failed"])),
            Outcome::Failed
        );
    }

    #[test]
    fn low_confidence_is_ignored_when_retries_disabled() {
        let gate = QualityGate::default();
        assert_eq!(
            gate.evaluate(&state_with("Plenty of content here.", 0.1, &[])),
            Outcome::Success
        );
    }

    #[test]
    fn low_confidence_requests_retry_while_budget_remains() {
        let gate = retrying_gate();
        let mut state = state_with("Plenty of content here.", 0.1, &[]);
        assert_eq!(gate.evaluate(&state), Outcome::RetryRecognition);

        state.apply(PartialUpdate {
            retry_budget: Some(0),
            ..PartialUpdate::default()
        });
        assert_eq!(gate.evaluate(&state), Outcome::Success);
    }

    #[test]
    fn terminal_evaluation_never_retries() {
        let gate = retrying_gate();
        let outcome = gate.evaluate_terminal(&state_with("Plenty of content here.", 0.1, &[]));
        assert!(outcome.is_terminal());
    }

    #[test]
    fn outcome_serialises_kebab_case() {
        let json = serde_json::to_string(&Outcome::InsufficientContent).unwrap();
        assert_eq!(json, "\"insufficient-content\"");
    }
}
