//! Per-request session key derivation and AEAD envelope primitives.
//!
//! All functions are pure. The nonce for `seal` is supplied by the caller
//! so the functions stay deterministic under test; production callers draw
//! it fresh from a CSPRNG for every invocation, and nonce reuse is ruled
//! out by the single-request lifetime of the derived key.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use sha2::Sha256;
use x25519_dalek::x25519;
use zeroize::Zeroizing;

use crate::error::SealError;

/// Domain-separation tag for HKDF. Must match clients byte-for-byte.
pub const HKDF_INFO: &[u8] = b"echolia-inference-v1";

/// Derived session key length in bytes (ChaCha20 key size).
pub const KEY_LEN: usize = 32;

/// ChaCha20-Poly1305 nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Derive the per-request session key.
///
/// Performs X25519 scalar multiplication of `local_secret` with
/// `peer_public`, then HKDF-SHA256 (empty salt, [`HKDF_INFO`], 32-byte
/// output) over the raw shared secret. The shared secret is zeroized
/// before this function returns; the returned key zeroizes itself on
/// drop.
///
/// Both sides of the protocol derive the same key:
/// `derive_session_key(server_secret, client_ephemeral_public)` equals
/// `derive_session_key(client_ephemeral_secret, server_public)`.
///
/// Low-order peer points are not rejected. X25519 defines output for
/// every 32-byte input, and a degenerate shared secret surfaces as an
/// authentication failure at [`open`].
pub fn derive_session_key(
    local_secret: &[u8; 32],
    peer_public: &[u8; 32],
) -> Zeroizing<[u8; KEY_LEN]> {
    let shared = Zeroizing::new(x25519(*local_secret, *peer_public));

    let hk = Hkdf::<Sha256>::new(None, shared.as_ref());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let Ok(()) = hk.expand(HKDF_INFO, key.as_mut()) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    key
}

/// Seal a plaintext under a session key.
///
/// Returns `(ciphertext, tag)`; the ciphertext has the same length as the
/// plaintext (the 16-byte tag is carried separately on the wire). No
/// additional associated data is bound. The caller must supply a fresh
/// CSPRNG nonce for every call under the same key.
pub fn seal(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> (Vec<u8>, [u8; TAG_LEN]) {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let Ok(mut sealed) = cipher.encrypt(Nonce::from_slice(nonce), plaintext) else {
        unreachable!("ChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    // encrypt() appends the tag; split it back off for the wire format.
    let tag_start = sealed.len() - TAG_LEN;
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&sealed[tag_start..]);
    sealed.truncate(tag_start);

    (sealed, tag)
}

/// Open a sealed envelope.
///
/// Reassembles `ciphertext || tag` and decrypts with no associated data.
/// The returned plaintext zeroizes itself on drop.
///
/// # Errors
///
/// Returns the single opaque [`SealError::Aead`] on any failure; callers
/// cannot distinguish a wrong key from tampered ciphertext.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
) -> Result<Zeroizing<Vec<u8>>, SealError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
        .map(Zeroizing::new)
        .map_err(|_| SealError::Aead)
}
