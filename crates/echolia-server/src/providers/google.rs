//! Google Gemini backend.

use echolia_core::provider::{ChatRequest, Completion, ProviderError, TokenUsage};
use serde::{Deserialize, Serialize};

use super::{map_error_status, map_request_error};

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Fast and cheap; sufficient for the structured extraction tasks.
const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Google Gemini API client.
#[derive(Debug)]
pub struct GoogleProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata", default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Default)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u64,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u64,
}

impl GoogleProvider {
    /// Build the client with the default model.
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self { http, api_key, model: DEFAULT_MODEL.to_string() }
    }

    /// Configured model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one generation.
    ///
    /// Gemini has no separate system channel in this shape; system
    /// instructions go in as the first user-role content.
    pub async fn generate(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        let body = GenerateRequest {
            contents: vec![
                Content { role: "user", parts: vec![Part { text: &request.system }] },
                Content { role: "user", parts: vec![Part { text: &request.user }] },
            ],
            generation_config: GenerationConfig {
                max_output_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let url = format!("{API_BASE_URL}/models/{}:generateContent", self.model);
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| map_request_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_error_status(status.as_u16(), format!("gemini returned {status}")));
        }

        let payload: GenerateResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Server(format!("gemini response decode failed: {err}")))?;

        let usage = payload.usage_metadata.unwrap_or_default();
        let usage = TokenUsage {
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
            total_tokens: usage.prompt_token_count + usage.candidates_token_count,
        };

        let (text, finish_reason) = match payload.candidates.into_iter().next() {
            Some(candidate) => {
                let text = candidate
                    .content
                    .map(|content| {
                        content.parts.into_iter().map(|part| part.text).collect::<String>()
                    })
                    .unwrap_or_default();
                (text, candidate.finish_reason.unwrap_or_else(|| "STOP".to_string()))
            }
            None => (String::new(), "STOP".to_string()),
        };

        tracing::info!(
            provider = "google",
            model = %self.model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            finish_reason = %finish_reason,
            "provider call complete"
        );

        Ok(Completion { text, model: self.model.clone(), usage, finish_reason })
    }
}
