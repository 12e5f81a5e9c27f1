//! Staged workflow turning one recording into a structured, tagged story.
//!
//! # Architecture
//!
//! ```text
//! VoiceWorkflow::run(source)
//!        │
//!        ├─ validate(source)                         → ValidationError
//!        │
//!        ├─ WorkflowEngine::invoke(StateRecord)      ← walks WorkflowGraph
//!        │     recognition  spawn_blocking(SttEngine::transcribe)
//!        │     cleanup      TextTransformer (Cleanup)
//!        │     structuring  TextTransformer (Structure)
//!        │     tagging      TextTransformer (Tags)
//!        │     QualityGate  → success | insufficient-content | failed
//!        │                    (| retry-recognition when enabled)
//!        │
//!        ├─ on EngineError: FallbackExecutor (linear, no gate)
//!        │
//!        └─ ProcessingResult::assemble
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_to_story::config::{AppConfig, AppPaths};
//! use voice_to_story::pipeline::VoiceWorkflow;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let workflow = VoiceWorkflow::from_config(&config, &AppPaths::new());
//!
//!     match workflow.run("memo.wav").await {
//!         Ok(result) => println!("{}", serde_json::to_string_pretty(&result).unwrap()),
//!         Err(e) => eprintln!("rejected: {e}"),
//!     }
//! }
//! ```

pub mod engine;
pub mod fallback;
pub mod gate;
pub mod graph;
pub mod result;
pub mod runner;
pub mod stages;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use engine::{EngineError, EngineRun, WorkflowEngine};
pub use fallback::{FallbackExecutor, FallbackFailure};
pub use gate::{Outcome, QualityGate};
pub use graph::{Edge, GraphError, Target, WorkflowGraph};
pub use result::{Diagnostics, ExecutionPath, ProcessingResult};
pub use runner::{ValidationError, VoiceWorkflow};
pub use stages::{StageError, StageRunner, RECOGNITION_PLACEHOLDER};
pub use state::{PartialUpdate, Stage, StateRecord};
