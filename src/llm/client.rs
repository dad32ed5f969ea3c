//! Minimal HTTP client for chat-completion APIs.
//!
//! One request per call, no retries, no streaming. The rendered prompt goes
//! out as a single user message and the reply text comes back untouched.

use crate::config::ModelSettings;
use crate::otel::spans::llm_span;
use crate::types::{AskError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::Instrument;

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAI,
    Anthropic,
}

impl LlmProvider {
    /// Pick the provider from the model name.
    ///
    /// `claude*` / `anthropic*` go to Anthropic, everything else to OpenAI.
    pub fn from_model(model: &str) -> Self {
        if model.starts_with("claude") || model.starts_with("anthropic") {
            LlmProvider::Anthropic
        } else {
            LlmProvider::OpenAI
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OPENAI_API_KEY",
            LlmProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    /// Value for the `gen_ai.system` span attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Anthropic => "anthropic",
        }
    }
}

/// Text-generation capability used by the synthesizer.
///
/// Implemented by [`LlmClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Send a fully rendered prompt and return the raw reply text.
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model name, for logging.
    fn model(&self) -> &str;
}

/// OpenAI API response.
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Anthropic API response.
#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

/// Chat-completion client for OpenAI and Anthropic.
pub struct LlmClient {
    api_key: String,
    model: String,
    temperature: f32,
    provider: LlmProvider,
    client: Client,
}

impl LlmClient {
    /// Create a client for the configured model.
    ///
    /// # Errors
    ///
    /// Returns `AskError::LlmError` if the HTTP client cannot be built
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AskError::LlmError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            provider: settings.provider(),
            client,
        })
    }

    /// Provider in use.
    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    /// Call OpenAI Chat Completions.
    async fn call_openai(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(OPENAI_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "user", "content": prompt}
                ],
                "temperature": self.temperature
            }))
            .send()
            .await
            .map_err(|e| AskError::LlmError(format!("OpenAI API error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AskError::LlmError(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AskError::LlmError(format!("OpenAI API error {}: {}", status, body)));
        }

        parse_openai(&body)
    }

    /// Call Anthropic Messages.
    async fn call_anthropic(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "max_tokens": 4096,
                "messages": [
                    {"role": "user", "content": prompt}
                ],
                "temperature": self.temperature
            }))
            .send()
            .await
            .map_err(|e| AskError::LlmError(format!("Anthropic API error: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AskError::LlmError(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(AskError::LlmError(format!("Anthropic API error {}: {}", status, body)));
        }

        parse_anthropic(&body)
    }
}

#[async_trait]
impl SqlGenerator for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let span = llm_span(self.provider.as_str(), &self.model);
        async {
            let text = match self.provider {
                LlmProvider::OpenAI => self.call_openai(prompt).await?,
                LlmProvider::Anthropic => self.call_anthropic(prompt).await?,
            };
            tracing::debug!(chars = text.len(), "Model replied");
            Ok::<_, AskError>(text)
        }
        .instrument(span)
        .await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_openai(body: &str) -> Result<String> {
    let parsed: OpenAIResponse = serde_json::from_str(body)
        .map_err(|e| AskError::LlmError(format!("Failed to parse OpenAI response: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AskError::LlmError("No response from OpenAI".to_string()))
}

fn parse_anthropic(body: &str) -> Result<String> {
    let parsed: AnthropicResponse = serde_json::from_str(body)
        .map_err(|e| AskError::LlmError(format!("Failed to parse Anthropic response: {}", e)))?;

    if parsed.content.is_empty() {
        return Err(AskError::LlmError("No response from Anthropic".to_string()));
    }

    Ok(parsed
        .content
        .into_iter()
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join(""))
}
