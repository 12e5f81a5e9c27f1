//! Configuration module for the voice-to-story workflow.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform directories, TOML persistence via
//! `AppConfig::load` / `AppConfig::save`, and environment overrides.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, LlmConfig, LlmProvider, RetryConfig, SttConfig, WorkflowConfig};
