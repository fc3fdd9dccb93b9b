//! Echolia Cryptographic Primitives
//!
//! Cryptographic building blocks for the E2EE inference envelope. Pure
//! functions with deterministic outputs. Callers provide random bytes for
//! deterministic testing.
//!
//! # Key Lifecycle
//!
//! Each request derives a fresh symmetric key from the server's long-lived
//! X25519 identity and the client's ephemeral public point. The key lives
//! for exactly one request: open the inbound envelope, seal the outbound
//! one, then drop.
//!
//! ```text
//! Client ephemeral X25519 keypair      Server long-lived X25519 identity
//!        │                                    │
//!        └────────── ECDH ───────────────────┘
//!                      │
//!                      ▼
//!          HKDF-SHA256 ("echolia-inference-v1")
//!                      │
//!                      ▼
//!          ChaCha20-Poly1305 session key (32 B)
//!                      │
//!            open request / seal response
//! ```
//!
//! # Security
//!
//! Forward Secrecy:
//! - The client's half of the exchange is ephemeral; once discarded, past
//!   envelopes cannot be re-derived even if the server key later leaks.
//! - Server identity rotation bounds the exposure window of the static
//!   half.
//!
//! Authenticity:
//! - ChaCha20-Poly1305 rejects any tampering of ciphertext, nonce, or tag.
//! - Low-order peer points are not filtered; X25519 defines output for
//!   every 32-byte input and the AEAD check is the integrity gate.
//!
//! Key Hygiene:
//! - Shared secrets and derived keys are wrapped in [`zeroize::Zeroizing`]
//!   and overwritten when released, never left to ordinary deallocation.
//! - The persisted key blob zeroizes its scalar on drop.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod blob;
mod error;
mod keys;
mod session;

pub use blob::{decode_key_blob, encode_key_blob, KeyBlob, KeyBlobError, KEY_BLOB_VERSION};
pub use error::SealError;
pub use keys::{clamp_scalar, keypair_from_seed, public_from_secret};
pub use session::{derive_session_key, open, seal, HKDF_INFO, KEY_LEN, NONCE_LEN, TAG_LEN};
