//! Anthropic backend.

use echolia_core::provider::{ChatRequest, Completion, ProviderError, TokenUsage};
use serde::{Deserialize, Serialize};

use super::{map_error_status, map_request_error};

const API_BASE_URL: &str = "https://api.anthropic.com/v1";

const API_VERSION: &str = "2023-06-01";

const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Anthropic messages-API client.
#[derive(Debug)]
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicProvider {
    /// Build the client with the default model.
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key, model: DEFAULT_MODEL.to_string() }
    }

    /// Configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one generation. System instructions use the dedicated system
    /// channel; the user message is the only conversation turn.
    pub async fn generate(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: vec![Message { role: "user", content: &request.user }],
        };

        let response = self
            .http
            .post(format!("{API_BASE_URL}/messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_request_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_error_status(status.as_u16(), format!("anthropic returned {status}")));
        }

        let payload: MessagesResponse = response.json().await.map_err(|err| {
            ProviderError::Server(format!("anthropic response decode failed: {err}"))
        })?;

        let usage = payload.usage.unwrap_or_default();
        let usage = TokenUsage {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        };

        let text = payload.content.into_iter().map(|block| block.text).collect::<String>();
        let finish_reason = payload.stop_reason.unwrap_or_else(|| "end_turn".to_string());
        let model = payload.model.unwrap_or_else(|| self.model.clone());

        tracing::info!(
            provider = "anthropic",
            model = %model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            finish_reason = %finish_reason,
            "provider call complete"
        );

        Ok(Completion { text, model, usage, finish_reason })
    }
}
