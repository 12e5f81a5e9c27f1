//! Application settings structs, defaults, environment overrides and TOML
//! persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and handed to the
//! workflow once at construction.

use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LlmProvider
// ---------------------------------------------------------------------------

/// Selects which backend performs the text-transformation stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LlmProvider {
    /// Ollama's native `/api/chat` endpoint; no authentication required.
    Ollama,
    /// Any OpenAI-compatible REST API (OpenAI, Groq, LM Studio, vLLM …).
    OpenAiCompatible,
    /// In-process rule-based transformer; no network access.
    Local,
}

impl Default for LlmProvider {
    fn default() -> Self {
        Self::Ollama
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" | "openai-compatible" | "openaicompatible" => Ok(Self::OpenAiCompatible),
            "local" | "offline" => Ok(Self::Local),
            other => Err(format!("unknown LLM provider: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Settings for the text-transformation collaborators (cleanup, structuring,
/// tag extraction).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Which backend to use.
    pub provider: LlmProvider,
    /// Base URL of the API endpoint.
    ///
    /// - Ollama default: `http://localhost:11434`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key, `None` for local providers.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"llama3.1"`, `"gpt-4o-mini"`).
    pub model: String,
    /// Maximum seconds to wait for one transformation call.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            base_url: "http://localhost:11434".into(),
            api_key: None,
            model: "llama3.1".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the Whisper recognition engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttConfig {
    /// GGML model id (e.g. `"base"`) or an explicit path to a `.bin` file.
    pub model: String,
    /// Speech language as an ISO-639-1 code, or `"auto"` for Whisper's
    /// built-in language detection.
    pub language: String,
    /// Attempt GPU-accelerated inference when available.
    pub use_gpu: bool,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            model: "base".into(),
            language: "auto".into(),
            use_gpu: false,
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

/// Bounded low-confidence recognition retry.
///
/// The quality gate only routes back to recognition while the run's retry
/// budget is positive; the budget starts at `max_retries` and is decremented
/// every time the retry edge is taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whether the retry edge is wired into the graph at all.
    pub enabled: bool,
    /// Upper bound on extra recognition passes per run.
    pub max_retries: u32,
    /// Confidence below which a retry is requested.
    pub min_confidence: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: 1,
            min_confidence: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowConfig
// ---------------------------------------------------------------------------

/// Settings that shape one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Hard bound on node executions per engine invocation.
    pub recursion_limit: usize,
    /// Cleaned text shorter than this (after trimming) is
    /// `insufficient-content`.
    pub min_content_chars: usize,
    /// Inputs larger than this are rejected before any stage runs.
    pub max_audio_size_mb: u64,
    /// Accepted file extensions (lower-case, without the dot).  Only list
    /// formats the recognition engine can decode; `WhisperEngine` reads WAV.
    pub allowed_extensions: Vec<String>,
    /// Low-confidence recognition retry.
    pub retry: RetryConfig,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 25,
            min_content_chars: 10,
            max_audio_size_mb: 50,
            allowed_extensions: vec!["wav".to_string()],
            retry: RetryConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use voice_to_story::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let mut config = AppConfig::load().unwrap();
/// config.apply_env_overrides();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-transformation backend settings.
    pub llm: LlmConfig,
    /// Recognition engine settings.
    pub stt: SttConfig,
    /// Workflow engine settings.
    pub workflow: WorkflowConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Recognised keys: `WHISPER_MODEL`, `WHISPER_LANGUAGE`, `LLM_PROVIDER`,
    /// `LLM_MODEL`, `LLM_BASE_URL`, `LLM_API_KEY`, `MAX_AUDIO_SIZE_MB`.
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("WHISPER_MODEL") {
            self.stt.model = v;
        }
        if let Some(v) = get("WHISPER_LANGUAGE") {
            self.stt.language = v;
        }
        if let Some(v) = get("LLM_PROVIDER") {
            match v.parse() {
                Ok(provider) => self.llm.provider = provider,
                Err(e) => log::warn!("config: ignoring LLM_PROVIDER ({e})"),
            }
        }
        if let Some(v) = get("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = get("LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = get("LLM_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("MAX_AUDIO_SIZE_MB") {
            match v.trim().parse() {
                Ok(mb) => self.workflow.max_audio_size_mb = mb,
                Err(e) => log::warn!("config: ignoring MAX_AUDIO_SIZE_MB={v:?} ({e})"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
