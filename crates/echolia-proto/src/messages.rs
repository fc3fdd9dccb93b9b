//! HTTP request and response bodies for the inference endpoints.

use serde::{Deserialize, Serialize};

use crate::envelope::{EnvelopeError, SealedEnvelope};

/// Daily quota tier of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Default tier.
    Free,
    /// Principals with the AI add-on entitlement.
    Elevated,
}

impl Tier {
    /// Canonical wire string for this tier.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Elevated => "elevated",
        }
    }
}

/// Server public key advertisement.
///
/// Cacheable by the client until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    /// Base64-encoded 32-byte X25519 public point.
    pub public_key: String,
    /// Stable identifier binding this (private, public) pair.
    pub key_id: String,
    /// RFC 3339 UTC expiration instant.
    pub expires_at: String,
    /// Always `"X25519"`.
    pub algorithm: String,
}

/// Encrypted inference request from a client.
///
/// The task tag travels in cleartext and is deliberately left as a free
/// string: an unknown tag must reach the pipeline (and consume quota)
/// rather than be rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    /// Requested analysis, e.g. `"memory_distillation"`.
    pub task: String,
    /// Base64 ChaCha20-Poly1305 ciphertext.
    pub encrypted_content: String,
    /// Base64 12-byte nonce.
    pub nonce: String,
    /// Base64 16-byte authentication tag.
    pub mac: String,
    /// Base64 32-byte client ephemeral X25519 public key.
    pub ephemeral_public_key: String,
    /// Opaque client app version, for compatibility diagnostics only.
    pub client_version: String,
}

impl ExecuteRequest {
    /// Decode and validate the envelope fields of this request.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] on bad base64 or wrong decoded lengths.
    pub fn envelope(&self) -> Result<SealedEnvelope, EnvelopeError> {
        SealedEnvelope::decode(
            &self.encrypted_content,
            &self.nonce,
            &self.mac,
            &self.ephemeral_public_key,
        )
    }
}

/// A principal's current quota standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    /// Requests left today. Never negative.
    pub requests_remaining: u64,
    /// RFC 3339 UTC instant of the next quota reset (next UTC midnight).
    pub reset_at: String,
    /// The tier the ceiling was computed from.
    pub tier: Tier,
}

/// Encrypted inference response.
///
/// Sealed under the same derived key as the request, with an independently
/// generated fresh nonce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    /// Base64 ChaCha20-Poly1305 ciphertext of the canonical task result.
    pub encrypted_result: String,
    /// Base64 12-byte nonce.
    pub nonce: String,
    /// Base64 16-byte authentication tag.
    pub mac: String,
    /// Post-increment quota standing.
    pub usage: UsageInfo,
}

/// Error body for every failure except quota exhaustion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Canonical error tag, e.g. `"decrypt_failed"`.
    pub error: String,
}

/// Error body for quota exhaustion; carries usage so clients can display a
/// countdown to the reset instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaErrorBody {
    /// Always `"quota_exceeded"`.
    pub error: String,
    /// Current standing: zero remaining, next reset instant, tier.
    pub usage: UsageInfo,
}

/// Currently configured provider backend and model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    /// Backend name, e.g. `"google"`.
    pub provider: String,
    /// Model identifier, e.g. `"gemini-flash-latest"`.
    pub model: String,
}
