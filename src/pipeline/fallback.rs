//! Linear fallback path taken when the graph engine itself fails.
//!
//! Runs the four stages once, in order, with no quality gate and no error
//! capture: the first collaborator error stops the run.

use crate::pipeline::stages::{StageError, StageRunner};
use crate::pipeline::state::{Stage, StateRecord};

/// The fallback stopped at a failing stage.  `state` holds whatever the
/// earlier stages produced.
#[derive(Debug)]
pub struct FallbackFailure {
    pub state: StateRecord,
    pub error: StageError,
}

pub struct FallbackExecutor;

impl FallbackExecutor {
    pub async fn execute(
        stages: &StageRunner,
        mut state: StateRecord,
    ) -> Result<StateRecord, FallbackFailure> {
        log::debug!("pipeline[{}]: running linear fallback", state.session_id());
        for stage in Stage::ALL {
            match stages.run_strict(stage, &state).await {
                Ok(update) => state.apply(update),
                Err(error) => return Err(FallbackFailure { state, error }),
            }
        }
        Ok(state)
    }
}
