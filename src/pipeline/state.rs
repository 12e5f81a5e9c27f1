//! The State Record threaded through every stage and the partial updates
//! stages return.
//!
//! Stages never touch a [`StateRecord`] directly.  They read it and return a
//! [`PartialUpdate`]; the engine folds updates in with
//! [`StateRecord::apply`].  Merge rules:
//!
//! | Field kind | Rule |
//! |------------|------|
//! | outputs (`raw_output`, `tags`, …) | replaced when the update carries a value |
//! | `completed_stages`, `errors` | concatenated, never replaced |
//! | `stage_durations` | key-wise union, later value wins |
//!
//! Every rule is associative, so folding updates one by one and merging
//! them first with [`PartialUpdate::merge`] give the same record.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::story::StructuredDocument;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// The four ordered transformation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Recognition,
    Cleanup,
    Structuring,
    Tagging,
}

impl Stage {
    /// Canonical execution order.
    pub const ALL: [Stage; 4] = [
        Stage::Recognition,
        Stage::Cleanup,
        Stage::Structuring,
        Stage::Tagging,
    ];

    /// Name recorded in `completed_stages` and `stage_durations`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Recognition => "recognition",
            Self::Cleanup => "cleanup",
            Self::Structuring => "structuring",
            Self::Tagging => "tagging",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// PartialUpdate
// ---------------------------------------------------------------------------

/// The subset of State Record fields one stage produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialUpdate {
    pub raw_output: Option<String>,
    pub raw_confidence: Option<f32>,
    /// Time the recognition engine itself reported.
    pub recognition_elapsed: Option<Duration>,
    pub cleaned_output: Option<String>,
    pub removed_artifacts: Option<Vec<String>>,
    pub structured_output: Option<StructuredDocument>,
    pub tags: Option<Vec<String>>,
    pub completed_stages: Vec<String>,
    pub errors: Vec<String>,
    pub stage_durations: BTreeMap<String, Duration>,
    /// Remaining recognition retries; only the engine sets this.
    pub retry_budget: Option<u32>,
}

impl PartialUpdate {
    /// Bookkeeping every stage emits: its name and its wall-clock time.
    pub fn for_stage(stage: Stage, elapsed: Duration) -> Self {
        Self {
            completed_stages: vec![stage.label().to_string()],
            stage_durations: BTreeMap::from([(stage.label().to_string(), elapsed)]),
            ..Self::default()
        }
    }

    /// An update that only records an error.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Self::default()
        }
    }

    /// Append an error to this update.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.errors.push(message.into());
        self
    }

    /// Combine `self` followed by `later` into one update.
    pub fn merge(mut self, later: PartialUpdate) -> PartialUpdate {
        self.raw_output = later.raw_output.or(self.raw_output);
        self.raw_confidence = later.raw_confidence.or(self.raw_confidence);
        self.recognition_elapsed = later.recognition_elapsed.or(self.recognition_elapsed);
        self.cleaned_output = later.cleaned_output.or(self.cleaned_output);
        self.removed_artifacts = later.removed_artifacts.or(self.removed_artifacts);
        self.structured_output = later.structured_output.or(self.structured_output);
        self.tags = later.tags.or(self.tags);
        self.completed_stages.extend(later.completed_stages);
        self.errors.extend(later.errors);
        self.stage_durations.extend(later.stage_durations);
        self.retry_budget = later.retry_budget.or(self.retry_budget);
        self
    }
}

// ---------------------------------------------------------------------------
// StateRecord
// ---------------------------------------------------------------------------

/// Everything one run knows: its inputs, every stage's outputs, and the
/// diagnostics trail.
///
/// `source_ref` and `session_id` are fixed at construction and have no
/// setters.  The trail fields only ever grow.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    source_ref: PathBuf,
    session_id: Uuid,
    raw_output: Option<String>,
    raw_confidence: Option<f32>,
    recognition_elapsed: Option<Duration>,
    cleaned_output: Option<String>,
    removed_artifacts: Vec<String>,
    structured_output: Option<StructuredDocument>,
    tags: Vec<String>,
    completed_stages: Vec<String>,
    errors: Vec<String>,
    stage_durations: BTreeMap<String, Duration>,
    retry_budget: u32,
}

impl StateRecord {
    /// Fresh record for `source_ref` with a new session id.
    pub fn new(source_ref: impl Into<PathBuf>) -> Self {
        Self::with_session(source_ref, Uuid::new_v4())
    }

    /// Fresh record reusing an existing session id (used when the fallback
    /// path restarts a run).
    pub fn with_session(source_ref: impl Into<PathBuf>, session_id: Uuid) -> Self {
        Self {
            source_ref: source_ref.into(),
            session_id,
            raw_output: None,
            raw_confidence: None,
            recognition_elapsed: None,
            cleaned_output: None,
            removed_artifacts: Vec::new(),
            structured_output: None,
            tags: Vec::new(),
            completed_stages: Vec::new(),
            errors: Vec::new(),
            stage_durations: BTreeMap::new(),
            retry_budget: 0,
        }
    }

    /// Set the initial recognition retry budget.
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Fold `update` into the record.
    pub fn apply(&mut self, update: PartialUpdate) {
        if let Some(v) = update.raw_output {
            self.raw_output = Some(v);
        }
        if let Some(v) = update.raw_confidence {
            self.raw_confidence = Some(v);
        }
        if let Some(v) = update.recognition_elapsed {
            self.recognition_elapsed = Some(v);
        }
        if let Some(v) = update.cleaned_output {
            self.cleaned_output = Some(v);
        }
        if let Some(v) = update.removed_artifacts {
            self.removed_artifacts = v;
        }
        if let Some(v) = update.structured_output {
            self.structured_output = Some(v);
        }
        if let Some(v) = update.tags {
            self.tags = v;
        }
        if let Some(v) = update.retry_budget {
            self.retry_budget = v;
        }
        self.completed_stages.extend(update.completed_stages);
        self.errors.extend(update.errors);
        self.stage_durations.extend(update.stage_durations);
    }

    pub fn source_ref(&self) -> &Path {
        &self.source_ref
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn raw_output(&self) -> Option<&str> {
        self.raw_output.as_deref()
    }

    pub fn raw_confidence(&self) -> Option<f32> {
        self.raw_confidence
    }

    pub fn recognition_elapsed(&self) -> Option<Duration> {
        self.recognition_elapsed
    }

    pub fn cleaned_output(&self) -> Option<&str> {
        self.cleaned_output.as_deref()
    }

    pub fn removed_artifacts(&self) -> &[String] {
        &self.removed_artifacts
    }

    pub fn structured_output(&self) -> Option<&StructuredDocument> {
        self.structured_output.as_ref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn completed_stages(&self) -> &[String] {
        &self.completed_stages
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn stage_durations(&self) -> &BTreeMap<String, Duration> {
        &self.stage_durations
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// Take the outputs and trail apart for result assembly.
    pub(crate) fn into_parts(self) -> StateParts {
        StateParts {
            session_id: self.session_id,
            raw_output: self.raw_output,
            raw_confidence: self.raw_confidence,
            recognition_elapsed: self.recognition_elapsed,
            cleaned_output: self.cleaned_output,
            removed_artifacts: self.removed_artifacts,
            structured_output: self.structured_output,
            tags: self.tags,
            completed_stages: self.completed_stages,
            errors: self.errors,
            stage_durations: self.stage_durations,
        }
    }
}

/// Owned fields of a terminal record.
pub(crate) struct StateParts {
    pub session_id: Uuid,
    pub raw_output: Option<String>,
    pub raw_confidence: Option<f32>,
    pub recognition_elapsed: Option<Duration>,
    pub cleaned_output: Option<String>,
    pub removed_artifacts: Vec<String>,
    pub structured_output: Option<StructuredDocument>,
    pub tags: Vec<String>,
    pub completed_stages: Vec<String>,
    pub errors: Vec<String>,
    pub stage_durations: BTreeMap<String, Duration>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::fallback_document;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn stage_updates() -> Vec<PartialUpdate> {
        vec![
            PartialUpdate {
                raw_output: Some("um so we went to Busan".into()),
                raw_confidence: Some(0.82),
                ..PartialUpdate::for_stage(Stage::Recognition, ms(40))
            },
            PartialUpdate {
                cleaned_output: Some("So we went to Busan.".into()),
                removed_artifacts: Some(vec!["um".into()]),
                ..PartialUpdate::for_stage(Stage::Cleanup, ms(12))
            },
            PartialUpdate {
                structured_output: Some(fallback_document("So we went to Busan.")),
                ..PartialUpdate::for_stage(Stage::Structuring, ms(30))
            }
            .with_error("structuring failed: timed out"),
            PartialUpdate {
                tags: Some(vec!["#busan".into()]),
                ..PartialUpdate::for_stage(Stage::Tagging, ms(5))
            },
        ]
    }

    #[test]
    fn new_record_is_empty() {
        let state = StateRecord::new("memo.wav");
        assert_eq!(state.source_ref(), Path::new("memo.wav"));
        assert!(state.raw_output().is_none());
        assert!(state.completed_stages().is_empty());
        assert!(state.errors().is_empty());
        assert_eq!(state.retry_budget(), 0);
    }

    #[test]
    fn session_ids_are_unique_per_record() {
        assert_ne!(
            StateRecord::new("a.wav").session_id(),
            StateRecord::new("a.wav").session_id()
        );
    }

    #[test]
    fn apply_concatenates_trail_and_keeps_prior_outputs() {
        let mut state = StateRecord::new("memo.wav");
        for u in stage_updates() {
            state.apply(u);
        }

        assert_eq!(
            state.completed_stages(),
            ["recognition", "cleanup", "structuring", "tagging"]
        );
        assert_eq!(state.errors(), ["structuring failed: timed out"]);
        assert_eq!(state.raw_output(), Some("um so we went to Busan"));
        assert_eq!(state.cleaned_output(), Some("So we went to Busan."));
        assert_eq!(state.tags(), ["#busan"]);
        assert_eq!(state.stage_durations().len(), 4);
    }

    #[test]
    fn error_only_update_does_not_clear_outputs() {
        let mut state = StateRecord::new("memo.wav");
        state.apply(PartialUpdate {
            raw_output: Some("kept".into()),
            ..PartialUpdate::default()
        });
        state.apply(PartialUpdate::error("boom"));
        assert_eq!(state.raw_output(), Some("kept"));
        assert_eq!(state.errors(), ["boom"]);
    }

    #[test]
    fn folding_matches_premerged_update() {
        let updates = stage_updates();

        let mut folded = StateRecord::with_session("memo.wav", Uuid::nil());
        for u in updates.clone() {
            folded.apply(u);
        }

        let combined = updates
            .into_iter()
            .reduce(PartialUpdate::merge)
            .unwrap();
        let mut merged = StateRecord::with_session("memo.wav", Uuid::nil());
        merged.apply(combined);

        assert_eq!(folded, merged);
    }

    #[test]
    fn merge_is_associative() {
        let u = stage_updates();
        let left = u[0].clone().merge(u[1].clone()).merge(u[2].clone());
        let right = u[0].clone().merge(u[1].clone().merge(u[2].clone()));
        assert_eq!(left, right);
    }

    #[test]
    fn later_update_wins_for_outputs() {
        let first = PartialUpdate {
            raw_output: Some("first".into()),
            raw_confidence: Some(0.1),
            ..PartialUpdate::default()
        };
        let second = PartialUpdate {
            raw_output: Some("second".into()),
            ..PartialUpdate::default()
        };
        let merged = first.merge(second);
        assert_eq!(merged.raw_output.as_deref(), Some("second"));
        assert_eq!(merged.raw_confidence, Some(0.1));
    }

    #[test]
    fn stage_labels_follow_canonical_order() {
        let labels: Vec<_> = Stage::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, ["recognition", "cleanup", "structuring", "tagging"]);
    }
}
