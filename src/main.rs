//! Command-line entry point.
//!
//! # Startup sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`).
//! 2. Load [`AppConfig`] from `--config` or the per-user settings file.
//! 3. Apply environment overrides, then command-line overrides.
//! 4. Build the workflow (Whisper model + text transformer) from config.
//! 5. Run the workflow on the given file and print the result as JSON.
//!
//! Exits non-zero when the input is rejected or the run records an error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use voice_to_story::{
    config::{AppConfig, AppPaths, LlmProvider},
    pipeline::VoiceWorkflow,
};

#[derive(Parser)]
#[command(name = "voice-to-story")]
#[command(about = "Turn a voice recording into a structured, hashtagged story")]
#[command(version)]
struct Cli {
    /// Audio file to process
    source: PathBuf,

    /// Settings file (defaults to the per-user settings.toml)
    #[arg(long, env = "VOICE_TO_STORY_CONFIG")]
    config: Option<PathBuf>,

    /// Speech language code, or "auto"
    #[arg(long)]
    language: Option<String>,

    /// Text-transformation provider: ollama, openai or local
    #[arg(long)]
    provider: Option<LlmProvider>,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

fn main() -> ExitCode {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the run succeeded.
fn run(cli: Cli) -> Result<bool> {
    let paths = AppPaths::new();

    // 2. Configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    // 3. Overrides
    config.apply_env_overrides();
    if let Some(language) = cli.language {
        config.stt.language = language;
    }
    if let Some(provider) = cli.provider {
        config.llm.provider = provider;
    }

    // 4. Workflow
    let workflow = VoiceWorkflow::from_config(&config, &paths);

    // 5. Run
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let result = rt.block_on(workflow.run(&cli.source))?;

    let json = if cli.compact {
        serde_json::to_string(&result)?
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{json}");

    Ok(result.success)
}
