//! Text-transformation collaborators for the cleanup, structuring and
//! tag-extraction stages.
//!
//! This module provides:
//! * [`TextTransformer`] — async capability trait every backend implements.
//! * [`ApiTransformer`] — OpenAI-compatible REST backend.
//! * [`OllamaTransformer`] — native Ollama chat backend.
//! * [`LocalTransformer`] — offline rule-based backend.
//! * [`transformer_from_config`] — picks one of the above from [`LlmConfig`].
//! * [`PromptBuilder`] / [`PromptVariant`] — per-stage prompts.
//! * [`LlmError`] — error variants for transformation calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_to_story::config::AppConfig;
//! use voice_to_story::llm::{transformer_from_config, PromptVariant};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let transformer = transformer_from_config(&config.llm);
//!
//!     let cleaned = transformer
//!         .transform("um so we, uh, went to Busan", PromptVariant::Cleanup)
//!         .await
//!         .unwrap();
//!     println!("{cleaned}");
//! }
//! ```
//!
//! [`LlmConfig`]: crate::config::LlmConfig

pub mod local;
pub mod prompt;
pub mod transformer;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use local::LocalTransformer;
pub use prompt::{PromptBuilder, PromptVariant};
pub use transformer::{
    transformer_from_config, ApiTransformer, LlmError, OllamaTransformer, TextTransformer,
};

#[cfg(test)]
pub use transformer::ScriptedTransformer;
