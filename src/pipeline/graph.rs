//! Declarative workflow graph: which stage runs after which.
//!
//! ```text
//! recognition ─▶ cleanup ─▶ structuring ─▶ tagging ─▶ [gate]
//!      ▲                                                │
//!      └──────── retry-recognition (optional) ──────────┤
//!                                 success / insufficient-content / failed
//!                                                       ▼
//!                                                      END
//! ```
//!
//! The graph is data.  [`WorkflowEngine`](crate::pipeline::WorkflowEngine)
//! walks it; callers can build other shapes with [`WorkflowGraph::edge`] and
//! [`WorkflowGraph::gate`].

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use crate::pipeline::gate::Outcome;
use crate::pipeline::state::Stage;

/// Where an edge leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Stage(Stage),
    End,
}

impl From<Stage> for Target {
    fn from(stage: Stage) -> Self {
        Target::Stage(stage)
    }
}

/// Outgoing edge of a stage node.
#[derive(Debug, Clone, PartialEq)]
pub enum Edge {
    /// Always continue to the target.
    Direct(Target),
    /// Evaluate the quality gate and follow the route for its outcome.
    Gate(HashMap<Outcome, Target>),
}

/// A graph that failed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("graph has no entry stage")]
    NoEntry,

    #[error("stage {0} is reachable but has no outgoing edge")]
    MissingEdge(Stage),

    #[error("gate after {from} has no route for outcome {outcome}")]
    MissingRoute { from: Stage, outcome: Outcome },

    #[error("gate after {0} routes retry-recognition to END")]
    RetryToEnd(Stage),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowGraph {
    entry: Option<Stage>,
    edges: BTreeMap<Stage, Edge>,
}

impl WorkflowGraph {
    /// Empty graph; add an entry and edges before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// The four stages in order, then the gate.  With `retry_recognition`
    /// the gate can send the run back to recognition.
    pub fn standard(retry_recognition: bool) -> Self {
        let mut routes = HashMap::from([
            (Outcome::Success, Target::End),
            (Outcome::InsufficientContent, Target::End),
            (Outcome::Failed, Target::End),
        ]);
        if retry_recognition {
            routes.insert(Outcome::RetryRecognition, Stage::Recognition.into());
        }

        Self::new()
            .entry(Stage::Recognition)
            .edge(Stage::Recognition, Stage::Cleanup)
            .edge(Stage::Cleanup, Stage::Structuring)
            .edge(Stage::Structuring, Stage::Tagging)
            .gate(Stage::Tagging, routes)
    }

    pub fn entry(mut self, stage: Stage) -> Self {
        self.entry = Some(stage);
        self
    }

    /// Unconditional edge, replacing any existing edge out of `from`.
    pub fn edge(mut self, from: Stage, to: impl Into<Target>) -> Self {
        self.edges.insert(from, Edge::Direct(to.into()));
        self
    }

    /// Gate-routed edge, replacing any existing edge out of `from`.
    pub fn gate(mut self, from: Stage, routes: HashMap<Outcome, Target>) -> Self {
        self.edges.insert(from, Edge::Gate(routes));
        self
    }

    pub fn entry_stage(&self) -> Option<Stage> {
        self.entry
    }

    pub fn edge_from(&self, stage: Stage) -> Option<&Edge> {
        self.edges.get(&stage)
    }

    /// Check that every stage reachable from the entry can continue and that
    /// every gate routes all terminal outcomes.
    pub fn validate(&self) -> Result<(), GraphError> {
        let entry = self.entry.ok_or(GraphError::NoEntry)?;

        let mut seen = HashSet::new();
        let mut pending = vec![entry];
        while let Some(stage) = pending.pop() {
            if !seen.insert(stage) {
                continue;
            }
            match self.edges.get(&stage).ok_or(GraphError::MissingEdge(stage))? {
                Edge::Direct(Target::Stage(next)) => pending.push(*next),
                Edge::Direct(Target::End) => {}
                Edge::Gate(routes) => {
                    for outcome in [Outcome::Success, Outcome::InsufficientContent, Outcome::Failed] {
                        if !routes.contains_key(&outcome) {
                            return Err(GraphError::MissingRoute {
                                from: stage,
                                outcome,
                            });
                        }
                    }
                    if routes.get(&Outcome::RetryRecognition) == Some(&Target::End) {
                        return Err(GraphError::RetryToEnd(stage));
                    }
                    pending.extend(routes.values().filter_map(|t| match t {
                        Target::Stage(s) => Some(*s),
                        Target::End => None,
                    }));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_graph_is_valid() {
        assert_eq!(WorkflowGraph::standard(false).validate(), Ok(()));
        assert_eq!(WorkflowGraph::standard(true).validate(), Ok(()));
    }

    #[test]
    fn standard_graph_runs_stages_in_order() {
        let graph = WorkflowGraph::standard(false);
        let mut current = graph.entry_stage().unwrap();
        let mut order = vec![current];
        while let Some(Edge::Direct(Target::Stage(next))) = graph.edge_from(current) {
            current = *next;
            order.push(current);
        }
        assert_eq!(order, Stage::ALL);
        assert!(matches!(graph.edge_from(Stage::Tagging), Some(Edge::Gate(_))));
    }

    #[test]
    fn retry_route_only_when_enabled() {
        let routes = |g: &WorkflowGraph| match g.edge_from(Stage::Tagging) {
            Some(Edge::Gate(r)) => r.clone(),
            other => panic!("expected gate, got {other:?}"),
        };
        assert!(!routes(&WorkflowGraph::standard(false)).contains_key(&Outcome::RetryRecognition));
        assert_eq!(
            routes(&WorkflowGraph::standard(true))[&Outcome::RetryRecognition],
            Target::Stage(Stage::Recognition)
        );
    }

    #[test]
    fn missing_entry_is_rejected() {
        let graph = WorkflowGraph::new().edge(Stage::Recognition, Target::End);
        assert_eq!(graph.validate(), Err(GraphError::NoEntry));
    }

    #[test]
    fn dangling_stage_is_rejected() {
        let graph = WorkflowGraph::new()
            .entry(Stage::Recognition)
            .edge(Stage::Recognition, Stage::Cleanup);
        assert_eq!(graph.validate(), Err(GraphError::MissingEdge(Stage::Cleanup)));
    }

    #[test]
    fn gate_must_route_every_terminal_outcome() {
        let graph = WorkflowGraph::new().entry(Stage::Recognition).gate(
            Stage::Recognition,
            HashMap::from([(Outcome::Success, Target::End)]),
        );
        assert!(matches!(
            graph.validate(),
            Err(GraphError::MissingRoute { from: Stage::Recognition, .. })
        ));
    }

    #[test]
    fn retry_cannot_route_to_end() {
        let graph = WorkflowGraph::new().entry(Stage::Tagging).gate(
            Stage::Tagging,
            HashMap::from([
                (Outcome::Success, Target::End),
                (Outcome::InsufficientContent, Target::End),
                (Outcome::Failed, Target::End),
                (Outcome::RetryRecognition, Target::End),
            ]),
        );
        assert_eq!(graph.validate(), Err(GraphError::RetryToEnd(Stage::Tagging)));
    }

    #[test]
    fn cyclic_graph_without_end_still_validates() {
        let graph = WorkflowGraph::standard(false).edge(Stage::Tagging, Stage::Recognition);
        assert_eq!(graph.validate(), Ok(()));
    }
}
