//! Error types for envelope primitives.

use thiserror::Error;

/// Error opening a sealed envelope.
///
/// Deliberately carries no detail: authentication failure, a garbled
/// nonce, and a truncated ciphertext are indistinguishable to callers and
/// therefore to external observers.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SealError {
    /// AEAD decryption failed.
    #[error("decryption failed")]
    Aead,
}
