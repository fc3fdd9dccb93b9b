//! Sealed envelope wire format.
//!
//! An envelope is everything needed to reverse the AEAD given the server's
//! long-lived key: the ciphertext, the 12-byte nonce, the 16-byte Poly1305
//! tag, and the sender's 32-byte ephemeral X25519 public point. All four are
//! base64 on the wire.
//!
//! Decoding here is purely syntactic. A request that fails to decode has
//! cost the server nothing; authentication of the content itself is the
//! AEAD's job.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Poly1305 authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// X25519 public key length in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Errors produced while decoding an envelope from its wire form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A field was not valid base64.
    #[error("invalid base64 in {field}")]
    Base64 {
        /// Wire name of the offending field.
        field: &'static str,
    },

    /// A fixed-length field decoded to the wrong number of bytes.
    #[error("invalid {field} length: expected {expected} bytes, got {got}")]
    Length {
        /// Wire name of the offending field.
        field: &'static str,
        /// Required decoded length.
        expected: usize,
        /// Actual decoded length.
        got: usize,
    },
}

/// A decoded sealed envelope.
///
/// Field lengths are enforced by construction: `decode` rejects anything
/// that does not match the fixed sizes, so downstream code can rely on the
/// array types without re-checking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    /// Raw ciphertext. Same length as the plaintext; may be empty.
    pub ciphertext: Vec<u8>,
    /// AEAD nonce.
    pub nonce: [u8; NONCE_LEN],
    /// Poly1305 authentication tag.
    pub tag: [u8; TAG_LEN],
    /// Sender's ephemeral X25519 public point.
    pub ephemeral_public: [u8; PUBLIC_KEY_LEN],
}

impl SealedEnvelope {
    /// Decode an envelope from its four base64 wire fields.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if any field is not base64 or decodes to
    /// the wrong length. The ciphertext may be any length, including zero.
    pub fn decode(
        encrypted_content: &str,
        nonce: &str,
        mac: &str,
        ephemeral_public_key: &str,
    ) -> Result<Self, EnvelopeError> {
        let ciphertext = decode_base64("encrypted_content", encrypted_content)?;
        let nonce = decode_fixed::<NONCE_LEN>("nonce", nonce)?;
        let tag = decode_fixed::<TAG_LEN>("mac", mac)?;
        let ephemeral_public = decode_fixed::<PUBLIC_KEY_LEN>("ephemeral_public_key", ephemeral_public_key)?;

        Ok(Self { ciphertext, nonce, tag, ephemeral_public })
    }
}

/// Decode a base64 wire field into raw bytes.
///
/// # Errors
///
/// Returns [`EnvelopeError::Base64`] if the input is not valid base64.
pub fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    BASE64.decode(value).map_err(|_| EnvelopeError::Base64 { field })
}

/// Encode raw bytes as a base64 wire field.
pub fn encode_base64(value: &[u8]) -> String {
    BASE64.encode(value)
}

fn decode_fixed<const N: usize>(
    field: &'static str,
    value: &str,
) -> Result<[u8; N], EnvelopeError> {
    let bytes = decode_base64(field, value)?;
    let got = bytes.len();
    bytes.try_into().map_err(|_| EnvelopeError::Length { field, expected: N, got })
}
