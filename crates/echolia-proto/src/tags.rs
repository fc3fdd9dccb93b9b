//! Canonical error tags.
//!
//! Every failure the gateway can report maps to exactly one tag and one
//! HTTP status code. The tag is the only error detail a client ever sees;
//! in particular, `decrypt_failed` is deliberately the same whether the
//! authentication tag was wrong or the ciphertext never decoded.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical reason tags, one per error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorTag {
    /// No authenticated principal. HTTP 401.
    AuthRequired,
    /// The task tag names no registered analysis. HTTP 400.
    UnknownTask,
    /// Envelope fields failed base64 or length validation. HTTP 400.
    InvalidEnvelope,
    /// AEAD open failed. HTTP 422.
    DecryptFailed,
    /// Daily ceiling reached. HTTP 429.
    QuotaExceeded,
    /// Provider unreachable, timed out, or rate limited. HTTP 502.
    ProviderUnavailable,
    /// Provider rejected the request. HTTP 502.
    ProviderRejected,
    /// Provider-side failure. HTTP 502.
    ProviderError,
    /// Model output failed JSON or schema validation. HTTP 502.
    ModelOutputInvalid,
    /// Key store or ledger I/O failure. HTTP 500.
    ServerError,
}

impl ErrorTag {
    /// Canonical wire string for this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthRequired => "auth_required",
            Self::UnknownTask => "unknown_task",
            Self::InvalidEnvelope => "invalid_envelope",
            Self::DecryptFailed => "decrypt_failed",
            Self::QuotaExceeded => "quota_exceeded",
            Self::ProviderUnavailable => "provider_unavailable",
            Self::ProviderRejected => "provider_rejected",
            Self::ProviderError => "provider_error",
            Self::ModelOutputInvalid => "model_output_invalid",
            Self::ServerError => "server_error",
        }
    }

    /// The single HTTP status code this tag maps to.
    pub fn status(self) -> u16 {
        match self {
            Self::AuthRequired => 401,
            Self::UnknownTask | Self::InvalidEnvelope => 400,
            Self::DecryptFailed => 422,
            Self::QuotaExceeded => 429,
            Self::ProviderUnavailable
            | Self::ProviderRejected
            | Self::ProviderError
            | Self::ModelOutputInvalid => 502,
            Self::ServerError => 500,
        }
    }
}

impl fmt::Display for ErrorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_serialize_as_snake_case() {
        let json = serde_json::to_string(&ErrorTag::DecryptFailed).unwrap();
        assert_eq!(json, "\"decrypt_failed\"");
    }

    #[test]
    fn status_codes_match_the_error_table() {
        assert_eq!(ErrorTag::AuthRequired.status(), 401);
        assert_eq!(ErrorTag::UnknownTask.status(), 400);
        assert_eq!(ErrorTag::InvalidEnvelope.status(), 400);
        assert_eq!(ErrorTag::DecryptFailed.status(), 422);
        assert_eq!(ErrorTag::QuotaExceeded.status(), 429);
        assert_eq!(ErrorTag::ProviderUnavailable.status(), 502);
        assert_eq!(ErrorTag::ProviderRejected.status(), 502);
        assert_eq!(ErrorTag::ProviderError.status(), 502);
        assert_eq!(ErrorTag::ModelOutputInvalid.status(), 502);
        assert_eq!(ErrorTag::ServerError.status(), 500);
    }
}
