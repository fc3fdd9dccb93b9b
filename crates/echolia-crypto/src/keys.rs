//! X25519 key material helpers.

use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

/// Clamp a 32-byte scalar per RFC 7748.
///
/// Clears the bottom 3 bits, clears the top bit, sets bit 254.
pub fn clamp_scalar(mut scalar: [u8; 32]) -> [u8; 32] {
    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
    scalar
}

/// Compute the X25519 public point for a secret scalar.
pub fn public_from_secret(secret: &[u8; 32]) -> [u8; 32] {
    x25519(*secret, X25519_BASEPOINT_BYTES)
}

/// Build an X25519 keypair from 32 uniformly random bytes.
///
/// The seed is clamped into a valid scalar; the public point is derived by
/// basepoint multiplication. The caller supplies the randomness (CSPRNG in
/// production, fixed bytes in tests).
pub fn keypair_from_seed(seed: [u8; 32]) -> ([u8; 32], [u8; 32]) {
    let secret = clamp_scalar(seed);
    let public = public_from_secret(&secret);
    (secret, public)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_sets_expected_bits() {
        let clamped = clamp_scalar([0xFF; 32]);
        assert_eq!(clamped[0] & 0b0000_0111, 0);
        assert_eq!(clamped[31] & 0b1000_0000, 0);
        assert_eq!(clamped[31] & 0b0100_0000, 0b0100_0000);
    }

    #[test]
    fn keypair_is_deterministic_in_the_seed() {
        let (secret_a, public_a) = keypair_from_seed([7u8; 32]);
        let (secret_b, public_b) = keypair_from_seed([7u8; 32]);
        assert_eq!(secret_a, secret_b);
        assert_eq!(public_a, public_b);
    }

    #[test]
    fn public_matches_secret_derivation() {
        let (secret, public) = keypair_from_seed([42u8; 32]);
        assert_eq!(public_from_secret(&secret), public);
    }
}
