//! LLM provider backends.
//!
//! A sealed set of three integrations behind one gateway enum. The set is
//! closed on purpose: backends change rarely and must share uniform
//! timeout and error semantics, so variant dispatch beats an open plugin
//! surface.
//!
//! Selection happens once at startup — the first configured backend in
//! the order Gemini, OpenAI, Anthropic — and is immutable thereafter.
//! With no key configured, initialization fails and the server does not
//! start.
//!
//! Per-call structured logs record provider, model, token counts, and
//! finish reason. Never the messages.

mod anthropic;
mod google;
mod openai;

use std::time::Duration;

pub use anthropic::AnthropicProvider;
use echolia_core::provider::{ChatRequest, Completion, Provider, ProviderError};
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
use thiserror::Error;

use crate::config::Config;

/// Error constructing the gateway at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderInitError {
    /// No backend API key is configured.
    #[error("no LLM provider API key configured")]
    NoBackend,

    /// The HTTP client could not be built.
    #[error("provider HTTP client construction failed: {0}")]
    Http(String),
}

/// The configured backend, selected once at startup.
#[derive(Debug)]
pub enum ProviderGateway {
    /// Google Gemini.
    Google(GoogleProvider),
    /// OpenAI.
    OpenAi(OpenAiProvider),
    /// Anthropic.
    Anthropic(AnthropicProvider),
}

impl ProviderGateway {
    /// Select and build the first configured backend.
    ///
    /// # Errors
    ///
    /// [`ProviderInitError::NoBackend`] if no API key is configured.
    pub fn from_config(config: &Config) -> Result<Self, ProviderInitError> {
        let http = http_client(config.provider_timeout)?;

        if let Some(key) = &config.gemini_api_key {
            Ok(Self::Google(GoogleProvider::new(http, key.clone())))
        } else if let Some(key) = &config.openai_api_key {
            Ok(Self::OpenAi(OpenAiProvider::new(http, key.clone())))
        } else if let Some(key) = &config.anthropic_api_key {
            Ok(Self::Anthropic(AnthropicProvider::new(http, key.clone())))
        } else {
            Err(ProviderInitError::NoBackend)
        }
    }
}

impl Provider for ProviderGateway {
    async fn generate(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        match self {
            Self::Google(provider) => provider.generate(request).await,
            Self::OpenAi(provider) => provider.generate(request).await,
            Self::Anthropic(provider) => provider.generate(request).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Google(_) => "google",
            Self::OpenAi(_) => "openai",
            Self::Anthropic(_) => "anthropic",
        }
    }

    fn model(&self) -> &str {
        match self {
            Self::Google(provider) => provider.model(),
            Self::OpenAi(provider) => provider.model(),
            Self::Anthropic(provider) => provider.model(),
        }
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderInitError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| ProviderInitError::Http(err.to_string()))
}

/// Map an HTTP status from a backend onto the normalized categories.
pub(crate) fn map_error_status(status: u16, detail: String) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited(detail),
        401 | 403 => ProviderError::Unauthorized(detail),
        400..=499 => ProviderError::BadRequest(detail),
        _ => ProviderError::Server(detail),
    }
}

/// Map a reqwest transport failure (timeout, DNS, connection reset).
pub(crate) fn map_request_error(err: &reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transport("request timed out".to_string())
    } else {
        ProviderError::Transport(err.to_string())
    }
}
