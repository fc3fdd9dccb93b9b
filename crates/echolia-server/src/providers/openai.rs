//! OpenAI backend.

use echolia_core::provider::{ChatRequest, Completion, ProviderError, TokenUsage};
use serde::{Deserialize, Serialize};

use super::{map_error_status, map_request_error};

const API_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI chat-completions client.
#[derive(Debug)]
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

impl OpenAiProvider {
    /// Build the client with the default model.
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key, model: DEFAULT_MODEL.to_string() }
    }

    /// Configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one generation.
    pub async fn generate(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        let body = CompletionsRequest {
            model: &self.model,
            messages: vec![
                Message { role: "system", content: &request.system },
                Message { role: "user", content: &request.user },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(format!("{API_BASE_URL}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_request_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_error_status(status.as_u16(), format!("openai returned {status}")));
        }

        let payload: CompletionsResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Server(format!("openai response decode failed: {err}")))?;

        let usage = payload.usage.unwrap_or_default();
        let usage = TokenUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        };

        let (text, finish_reason) = match payload.choices.into_iter().next() {
            Some(choice) => (
                choice.message.content.unwrap_or_default(),
                choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            ),
            None => (String::new(), "stop".to_string()),
        };

        let model = payload.model.unwrap_or_else(|| self.model.clone());

        tracing::info!(
            provider = "openai",
            model = %model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            finish_reason = %finish_reason,
            "provider call complete"
        );

        Ok(Completion { text, model, usage, finish_reason })
    }
}
