//! Versioned on-disk key blob codec.
//!
//! Layout (all offsets in bytes):
//!
//! ```text
//! 0        1                33               65        73        81
//! ┌────────┬────────────────┬────────────────┬─────────┬─────────┬──────────┐
//! │ version│ private scalar │ public point   │ created │ expires │ key id   │
//! │  0x01  │ 32 B raw       │ 32 B raw       │ i64 BE  │ i64 BE  │ UTF-8    │
//! └────────┴────────────────┴────────────────┴─────────┴─────────┴──────────┘
//! ```
//!
//! Timestamps are seconds since the Unix epoch. The key id runs to end of
//! file. Decoding verifies that the public point matches the scalar's
//! derivation, so a blob whose halves disagree is rejected as corrupt.

use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

use crate::keys::public_from_secret;

/// Current key blob format version.
pub const KEY_BLOB_VERSION: u8 = 0x01;

/// Fixed-size prefix before the key id: version + scalar + point + 2 × i64.
const FIXED_LEN: usize = 1 + 32 + 32 + 8 + 8;

/// A decoded server identity blob.
///
/// Zeroizes the private scalar on drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBlob {
    /// X25519 private scalar, clamped.
    pub secret: [u8; 32],
    /// Matching X25519 public point.
    pub public: [u8; 32],
    /// Creation instant, seconds since epoch.
    pub created_at_secs: i64,
    /// Expiration instant, seconds since epoch.
    pub expires_at_secs: i64,
    /// Stable key identifier, e.g. `srv-2026-08`.
    pub key_id: String,
}

impl Drop for KeyBlob {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

/// Errors decoding a persisted key blob.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyBlobError {
    /// Leading version byte is not a known format.
    #[error("unsupported key blob version: {0:#04x}")]
    UnsupportedVersion(u8),

    /// The blob is shorter than the fixed prefix.
    #[error("truncated key blob: expected at least {expected} bytes, got {got}")]
    Truncated {
        /// Minimum valid length.
        expected: usize,
        /// Actual length.
        got: usize,
    },

    /// The stored public point does not derive from the stored scalar.
    #[error("key blob public point does not match its scalar")]
    KeyMismatch,

    /// The key id bytes are not valid UTF-8.
    #[error("key blob identifier is not valid UTF-8")]
    BadIdentifier,
}

/// Encode a key blob into its on-disk byte layout.
///
/// The returned buffer zeroizes itself on drop; it contains the private
/// scalar.
pub fn encode_key_blob(blob: &KeyBlob) -> Zeroizing<Vec<u8>> {
    let mut bytes = Zeroizing::new(Vec::with_capacity(FIXED_LEN + blob.key_id.len()));
    bytes.push(KEY_BLOB_VERSION);
    bytes.extend_from_slice(&blob.secret);
    bytes.extend_from_slice(&blob.public);
    bytes.extend_from_slice(&blob.created_at_secs.to_be_bytes());
    bytes.extend_from_slice(&blob.expires_at_secs.to_be_bytes());
    bytes.extend_from_slice(blob.key_id.as_bytes());
    bytes
}

/// Decode and validate an on-disk key blob.
///
/// # Errors
///
/// Returns [`KeyBlobError`] on a bad version byte, a short buffer, a
/// public point that does not match the scalar, or a non-UTF-8 key id.
pub fn decode_key_blob(bytes: &[u8]) -> Result<KeyBlob, KeyBlobError> {
    if bytes.len() < FIXED_LEN {
        return Err(KeyBlobError::Truncated { expected: FIXED_LEN, got: bytes.len() });
    }

    let version = bytes[0];
    if version != KEY_BLOB_VERSION {
        return Err(KeyBlobError::UnsupportedVersion(version));
    }

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&bytes[1..33]);
    let mut public = [0u8; 32];
    public.copy_from_slice(&bytes[33..65]);

    if public_from_secret(&secret) != public {
        secret.zeroize();
        return Err(KeyBlobError::KeyMismatch);
    }

    let mut created = [0u8; 8];
    created.copy_from_slice(&bytes[65..73]);
    let mut expires = [0u8; 8];
    expires.copy_from_slice(&bytes[73..81]);

    let key_id = match std::str::from_utf8(&bytes[FIXED_LEN..]) {
        Ok(id) => id.to_string(),
        Err(_) => {
            secret.zeroize();
            return Err(KeyBlobError::BadIdentifier);
        }
    };

    Ok(KeyBlob {
        secret,
        public,
        created_at_secs: i64::from_be_bytes(created),
        expires_at_secs: i64::from_be_bytes(expires),
        key_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;

    fn sample_blob() -> KeyBlob {
        let (secret, public) = keypair_from_seed([11u8; 32]);
        KeyBlob {
            secret,
            public,
            created_at_secs: 1_780_000_000,
            expires_at_secs: 1_782_592_000,
            key_id: "srv-2026-08".to_string(),
        }
    }

    #[test]
    fn encode_decode_round_trips() {
        let blob = sample_blob();
        let bytes = encode_key_blob(&blob);
        let decoded = decode_key_blob(&bytes).unwrap();
        assert_eq!(decoded, blob);
    }

    #[test]
    fn rejects_unknown_version() {
        let blob = sample_blob();
        let mut bytes = encode_key_blob(&blob).to_vec();
        bytes[0] = 0x02;

        assert_eq!(decode_key_blob(&bytes), Err(KeyBlobError::UnsupportedVersion(0x02)));
    }

    #[test]
    fn rejects_truncated_blob() {
        let blob = sample_blob();
        let bytes = encode_key_blob(&blob);

        let err = decode_key_blob(&bytes[..40]).unwrap_err();
        assert!(matches!(err, KeyBlobError::Truncated { .. }));
    }

    #[test]
    fn rejects_mismatched_public_point() {
        let blob = sample_blob();
        let mut bytes = encode_key_blob(&blob).to_vec();
        bytes[33] ^= 0xFF;

        assert_eq!(decode_key_blob(&bytes), Err(KeyBlobError::KeyMismatch));
    }

    #[test]
    fn empty_key_id_is_allowed() {
        let mut blob = sample_blob();
        blob.key_id = String::new();

        let bytes = encode_key_blob(&blob);
        assert_eq!(bytes.len(), FIXED_LEN);
        assert_eq!(decode_key_blob(&bytes).unwrap().key_id, "");
    }
}
