//! Completion service abstraction and implementations.
//!
//! Defines the [`CompletionService`] trait and concrete implementations:
//! - **[`DisabledCompletion`]** — always fails; used when no provider is configured.
//! - **[`OpenAiCompletion`]** — calls an OpenAI-compatible chat completions endpoint.
//!
//! # Provider Selection
//!
//! ```rust
//! # use expert_agent::config::CompletionConfig;
//! # use expert_agent::completion::create_service;
//! let mut config = CompletionConfig::default();
//! config.provider = "disabled".to_string();
//! let service = create_service(&config).unwrap();
//! assert_eq!(service.model_name(), "disabled");
//! ```
//!
//! # Failure Handling
//!
//! No retries are attempted here. A request that exceeds
//! `completion.timeout_secs` fails with [`CompletionError::Timeout`]; every
//! other failure (network, non-2xx status, malformed body, missing key)
//! collapses into [`CompletionError::Failed`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::CompletionConfig;
use crate::trigger::RESOURCE_MARKER;

/// Failure of a single completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("completion failed: {0}")]
    Failed(String),
}

/// An opaque text-completion backend.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Sends one system instruction and one user turn, returning the
    /// model's raw text.
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> std::result::Result<String, CompletionError>;
}

/// Built-in system prompt used when `completion.system_prompt` is unset.
pub fn default_system_prompt() -> String {
    format!(
        "You are ExpertAgent, an intelligent educational assistant.\n\
         - You provide clear, structured explanations.\n\
         - You adapt your responses to the student's level.\n\
         - You ground your answers in established, correct knowledge.\n\
         - If you don't know something, you say so instead of guessing.\n\
         - When study resources would help the student, end your reply with a \
         final line `{} <keywords>` listing a few space-separated topic keywords.",
        RESOURCE_MARKER
    )
}

// ============ Disabled Provider ============

/// A completion service that refuses every request.
pub struct DisabledCompletion;

#[async_trait]
impl CompletionService for DisabledCompletion {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        _user_message: &str,
    ) -> std::result::Result<String, CompletionError> {
        Err(CompletionError::Failed(
            "completion provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI Provider ============

/// Completion service for OpenAI-compatible `/chat/completions` endpoints.
pub struct OpenAiCompletion {
    model: String,
    endpoint: String,
    api_key: String,
    temperature: f64,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiCompletion {
    /// Create a new provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key environment variable is unset or the
    /// HTTP client cannot be built.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            anyhow::anyhow!("{} environment variable not set", config.api_key_env)
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Like [`new`](Self::new) but with an explicit key.
    pub fn with_api_key(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: api_key.into(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn classify(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            CompletionError::Failed(err.to_string())
        }
    }
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f64,
}

#[async_trait]
impl CompletionService for OpenAiCompletion {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> std::result::Result<String, CompletionError> {
        let body = ApiRequest {
            model: &self.model,
            messages: vec![
                ApiMessage {
                    role: "system",
                    content: system_prompt,
                },
                ApiMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.model, endpoint = %self.endpoint, "sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(CompletionError::Failed(format!(
                "API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| self.classify(e))?;
        parse_completion_response(&json)
    }
}

/// Extracts `choices[0].message.content` from a chat completions response.
pub fn parse_completion_response(
    json: &serde_json::Value,
) -> std::result::Result<String, CompletionError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CompletionError::Failed("malformed response: missing choices[0].message.content".into())
        })
}

/// Create the appropriate [`CompletionService`] based on configuration.
///
/// | Config Value | Service |
/// |-------------|---------|
/// | `"disabled"` | [`DisabledCompletion`] |
/// | `"openai"` | [`OpenAiCompletion`] |
pub fn create_service(config: &CompletionConfig) -> Result<Box<dyn CompletionService>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledCompletion)),
        "openai" => Ok(Box::new(OpenAiCompletion::new(config)?)),
        other => bail!("Unknown completion provider: {}", other),
    }
}
