//! `TextTransformer` capability and its HTTP-backed implementations.
//!
//! * [`ApiTransformer`] calls any OpenAI-compatible `/v1/chat/completions`
//!   endpoint (OpenAI, Groq, LM Studio, vLLM, Ollama in OpenAI mode).
//! * [`OllamaTransformer`] calls Ollama's native `/api/chat`.
//!
//! All connection details come from [`LlmConfig`]; nothing is hardcoded.
//! [`transformer_from_config`] picks the implementation once, so the
//! workflow never branches on provider identity.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{LlmConfig, LlmProvider};
use crate::llm::local::LocalTransformer;
use crate::llm::prompt::{PromptBuilder, PromptVariant};

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur during a transformation call.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// HTTP transport, connection or status error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The LLM returned a response with no usable text content.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TextTransformer trait
// ---------------------------------------------------------------------------

/// Text-transformation capability used by the cleanup, structuring and
/// tag-extraction stages.
///
/// Implementors must be `Send + Sync` so one instance can be shared by
/// concurrent runs behind an `Arc<dyn TextTransformer>`.
#[async_trait]
pub trait TextTransformer: Send + Sync {
    /// Apply `variant` to `text` and return the model's raw reply.
    async fn transform(&self, text: &str, variant: PromptVariant) -> Result<String, LlmError>;
}

/// Build the transformer selected by `config.provider`.
pub fn transformer_from_config(config: &LlmConfig) -> Arc<dyn TextTransformer> {
    log::info!(
        "llm: using {:?} provider (model {:?}, {})",
        config.provider,
        config.model,
        config.base_url
    );
    match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaTransformer::from_config(config)),
        LlmProvider::OpenAiCompatible => Arc::new(ApiTransformer::from_config(config)),
        LlmProvider::Local => Arc::new(LocalTransformer::new()),
    }
}

fn http_client(config: &LlmConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn non_empty(content: Option<&str>) -> Result<String, LlmError> {
    let text = content.ok_or(LlmError::EmptyResponse)?.trim();
    if text.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// ApiTransformer
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat-completions client.
///
/// The `Authorization: Bearer …` header is attached only when
/// `config.api_key` is a non-empty string.
pub struct ApiTransformer {
    client: reqwest::Client,
    config: LlmConfig,
    prompts: PromptBuilder,
}

impl ApiTransformer {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: http_client(config),
            config: config.clone(),
            prompts: PromptBuilder::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TextTransformer for ApiTransformer {
    async fn transform(&self, text: &str, variant: PromptVariant) -> Result<String, LlmError> {
        let (system_msg, user_msg) = self.prompts.build_chat(variant, text);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream":      false,
            "temperature": variant.temperature(),
            "max_tokens":  variant.max_tokens()
        });

        let mut req = self.client.post(self.endpoint()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?.error_for_status()?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        non_empty(json["choices"][0]["message"]["content"].as_str())
    }
}

// ---------------------------------------------------------------------------
// OllamaTransformer
// ---------------------------------------------------------------------------

/// Native Ollama `/api/chat` client.
pub struct OllamaTransformer {
    client: reqwest::Client,
    config: LlmConfig,
    prompts: PromptBuilder,
}

impl OllamaTransformer {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: http_client(config),
            config: config.clone(),
            prompts: PromptBuilder::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl TextTransformer for OllamaTransformer {
    async fn transform(&self, text: &str, variant: PromptVariant) -> Result<String, LlmError> {
        let (system_msg, user_msg) = self.prompts.build_chat(variant, text);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream": false,
            "options": {
                "temperature": variant.temperature(),
                "num_predict": variant.max_tokens()
            }
        });

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        non_empty(json["message"]["content"].as_str())
    }
}

// ---------------------------------------------------------------------------
// ScriptedTransformer  (test-only)
// ---------------------------------------------------------------------------

/// Test double answering each variant with a fixed reply or error.
/// Unscripted variants echo the input text.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedTransformer {
    replies: std::collections::HashMap<PromptVariant, Result<String, LlmError>>,
    calls: std::sync::Mutex<Vec<PromptVariant>>,
}

#[cfg(test)]
impl ScriptedTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, variant: PromptVariant, text: impl Into<String>) -> Self {
        self.replies.insert(variant, Ok(text.into()));
        self
    }

    pub fn fail(mut self, variant: PromptVariant, error: LlmError) -> Self {
        self.replies.insert(variant, Err(error));
        self
    }

    /// Variants requested so far, in call order.
    pub fn calls(&self) -> Vec<PromptVariant> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl TextTransformer for ScriptedTransformer {
    async fn transform(&self, text: &str, variant: PromptVariant) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(variant);
        match self.replies.get(&variant) {
            Some(reply) => reply.clone(),
            None => Ok(text.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
