//! Normalized LLM provider interface.
//!
//! The pipeline talks to every backend through one shape: a system
//! message, a user message, and fixed sampling parameters in; text plus
//! token usage out. Concrete backends (the server crate's Google, OpenAI,
//! and Anthropic clients) translate this to their wire formats and map
//! their failures onto the five normalized categories.

use std::future::Future;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum output tokens requested for core tasks.
pub const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Sampling temperature for core tasks. Low, for consistent JSON output.
pub const SAMPLING_TEMPERATURE: f32 = 0.3;

/// A normalized chat request.
///
/// Both messages embed decrypted content, so the whole request zeroizes
/// on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ChatRequest {
    /// System instructions.
    pub system: String,
    /// User message; carries the journal content verbatim.
    pub user: String,
    /// Output token ceiling.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

impl ChatRequest {
    /// Build a request with the fixed core-task sampling parameters.
    pub fn for_task(system: String, user: String) -> Self {
        Self { system, user, max_tokens: MAX_OUTPUT_TOKENS, temperature: SAMPLING_TEMPERATURE }
    }
}

/// Token accounting reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    /// Prompt-side tokens.
    pub input_tokens: u64,
    /// Completion-side tokens.
    pub output_tokens: u64,
    /// Total as reported (or summed) by the backend.
    pub total_tokens: u64,
}

/// A normalized completion.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Raw model output text.
    pub text: String,
    /// Concrete model that produced it.
    pub model: String,
    /// Token accounting.
    pub usage: TokenUsage,
    /// Backend finish reason, e.g. `stop` or `length`, verbatim.
    pub finish_reason: String,
}

/// Normalized provider failure categories.
///
/// Messages describe the transport-level failure only; they never contain
/// request or response content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure or timeout reaching the backend.
    #[error("provider transport failure: {0}")]
    Transport(String),

    /// The backend's own rate limit rejected the call.
    #[error("provider rate limited: {0}")]
    RateLimited(String),

    /// The backend rejected our credentials.
    #[error("provider credentials rejected: {0}")]
    Unauthorized(String),

    /// The backend rejected the request itself.
    #[error("provider rejected request: {0}")]
    BadRequest(String),

    /// Backend-side failure (5xx).
    #[error("provider internal error: {0}")]
    Server(String),
}

/// An LLM backend.
///
/// Implementations enforce their own call timeout (30 s by default) and
/// surface it as [`ProviderError::Transport`]. Per-call structured logs
/// record provider, model, token counts, and finish reason — never the
/// messages.
pub trait Provider: Send + Sync + 'static {
    /// Run one generation.
    fn generate(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<Completion, ProviderError>> + Send;

    /// Backend name, e.g. `"google"`.
    fn name(&self) -> &str;

    /// Concrete model identifier in use.
    fn model(&self) -> &str;
}
