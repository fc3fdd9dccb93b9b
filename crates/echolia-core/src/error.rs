//! Typed error model for the inference pipeline.
//!
//! Every failure maps to exactly one canonical tag and HTTP status (see
//! `echolia_proto::ErrorTag`). Nothing is retried automatically, and
//! nothing is masked inside the pipeline except the memory-wiping step,
//! which runs on every path.

use echolia_proto::{EnvelopeError, ErrorTag};
use thiserror::Error;

use crate::keystore::KeyStoreError;
use crate::provider::ProviderError;
use crate::quota::{QuotaError, UsageSnapshot};

/// A pipeline failure, one variant per §error-table kind.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// No authenticated principal. Raised at the HTTP edge, before the
    /// pipeline; included here so the whole table lives in one type.
    #[error("authentication required")]
    Unauthenticated,

    /// The task tag names no registered analysis.
    #[error("unknown task: {0}")]
    BadTask(String),

    /// Envelope fields failed base64 or length validation.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),

    /// AEAD open failed. Deliberately carries no detail: a wrong key and
    /// tampered ciphertext are indistinguishable to the client.
    #[error("decryption failed")]
    DecryptFailed,

    /// Daily ceiling reached. Carries the standing so the response can
    /// show a countdown.
    #[error("daily quota exhausted")]
    QuotaExceeded(UsageSnapshot),

    /// Backend unreachable, timed out, or rate limited.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Backend rejected the request.
    #[error("provider rejected request: {0}")]
    ProviderRejected(String),

    /// Backend-side failure.
    #[error("provider failed: {0}")]
    ProviderFailed(String),

    /// Model output failed JSON decoding or schema validation.
    #[error("model output invalid")]
    ModelOutputInvalid,

    /// Key store or ledger failure.
    #[error("internal error: {0}")]
    Server(String),
}

impl InferenceError {
    /// The canonical tag for this error.
    pub fn tag(&self) -> ErrorTag {
        match self {
            Self::Unauthenticated => ErrorTag::AuthRequired,
            Self::BadTask(_) => ErrorTag::UnknownTask,
            Self::MalformedEnvelope(_) => ErrorTag::InvalidEnvelope,
            Self::DecryptFailed => ErrorTag::DecryptFailed,
            Self::QuotaExceeded(_) => ErrorTag::QuotaExceeded,
            Self::ProviderUnavailable(_) => ErrorTag::ProviderUnavailable,
            Self::ProviderRejected(_) => ErrorTag::ProviderRejected,
            Self::ProviderFailed(_) => ErrorTag::ProviderError,
            Self::ModelOutputInvalid => ErrorTag::ModelOutputInvalid,
            Self::Server(_) => ErrorTag::ServerError,
        }
    }

    /// The single HTTP status this error maps to.
    pub fn status(&self) -> u16 {
        self.tag().status()
    }
}

impl From<ProviderError> for InferenceError {
    fn from(err: ProviderError) -> Self {
        match err {
            // The backend's own rate limit reads as unavailability to the
            // client; retrying later may succeed.
            ProviderError::Transport(msg) | ProviderError::RateLimited(msg) => {
                Self::ProviderUnavailable(msg)
            }
            ProviderError::BadRequest(msg) => Self::ProviderRejected(msg),
            // A credential failure is a server-side configuration problem,
            // not something the client can act on.
            ProviderError::Unauthorized(msg) | ProviderError::Server(msg) => {
                Self::ProviderFailed(msg)
            }
        }
    }
}

impl From<QuotaError> for InferenceError {
    fn from(err: QuotaError) -> Self {
        Self::Server(err.to_string())
    }
}

impl From<KeyStoreError> for InferenceError {
    fn from(err: KeyStoreError) -> Self {
        Self::Server(err.to_string())
    }
}
