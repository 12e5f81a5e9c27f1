//! Walks a [`WorkflowGraph`] over a [`StateRecord`].
//!
//! Every node execution counts as one step.  Once `recursion_limit` steps
//! have run, the next step aborts the invocation with
//! [`EngineError::RecursionLimit`], so even a graph with an unconditional
//! cycle terminates.

use thiserror::Error;

use crate::pipeline::gate::{Outcome, QualityGate};
use crate::pipeline::graph::{Edge, GraphError, Target, WorkflowGraph};
use crate::pipeline::stages::StageRunner;
use crate::pipeline::state::{PartialUpdate, Stage, StateRecord};

/// Failure of the graph walk itself (never of a stage).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid workflow graph: {0}")]
    InvalidGraph(#[from] GraphError),

    #[error("recursion limit of {0} steps exceeded")]
    RecursionLimit(usize),

    #[error("no route from {from} for outcome {outcome}")]
    Unroutable { from: Stage, outcome: Outcome },
}

/// A completed walk.
#[derive(Debug, Clone)]
pub struct EngineRun {
    pub state: StateRecord,
    pub outcome: Outcome,
    /// Node executions performed, retries included.
    pub steps: usize,
}

pub struct WorkflowEngine {
    graph: WorkflowGraph,
    gate: QualityGate,
    recursion_limit: usize,
}

impl WorkflowEngine {
    pub fn new(graph: WorkflowGraph, gate: QualityGate, recursion_limit: usize) -> Self {
        Self {
            graph,
            gate,
            recursion_limit,
        }
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Run the graph from its entry stage until an END target is reached.
    pub async fn invoke(
        &self,
        stages: &StageRunner,
        mut state: StateRecord,
    ) -> Result<EngineRun, EngineError> {
        self.graph.validate()?;
        let mut current = self.graph.entry_stage().ok_or(GraphError::NoEntry)?;
        let mut steps = 0usize;

        loop {
            check_limits(&mut steps, self.recursion_limit)?;
            log::debug!(
                "pipeline[{}]: step {steps} → {current}",
                state.session_id()
            );

            let update = stages.run(current, &state).await;
            state.apply(update);

            let edge = self
                .graph
                .edge_from(current)
                .ok_or(GraphError::MissingEdge(current))?;

            let (target, outcome) = match edge {
                Edge::Direct(target) => (*target, None),
                Edge::Gate(routes) => {
                    let outcome = self.gate.evaluate(&state);
                    let target = *routes.get(&outcome).ok_or(EngineError::Unroutable {
                        from: current,
                        outcome,
                    })?;
                    (target, Some(outcome))
                }
            };

            if outcome == Some(Outcome::RetryRecognition) {
                let remaining = state.retry_budget().saturating_sub(1);
                log::info!(
                    "pipeline[{}]: low recognition confidence {:.2}, retrying ({remaining} left)",
                    state.session_id(),
                    state.raw_confidence().unwrap_or(0.0)
                );
                state.apply(PartialUpdate {
                    retry_budget: Some(remaining),
                    ..PartialUpdate::default()
                });
            }

            match target {
                Target::Stage(next) => current = next,
                Target::End => {
                    let outcome = match outcome {
                        Some(o) => o,
                        None => self.gate.evaluate_terminal(&state),
                    };
                    log::info!(
                        "pipeline[{}]: finished with outcome {outcome} after {steps} steps",
                        state.session_id()
                    );
                    return Ok(EngineRun {
                        state,
                        outcome,
                        steps,
                    });
                }
            }
        }
    }
}

fn check_limits(steps: &mut usize, limit: usize) -> Result<(), EngineError> {
    *steps += 1;
    if *steps > limit {
        return Err(EngineError::RecursionLimit(limit));
    }
    Ok(())
}
