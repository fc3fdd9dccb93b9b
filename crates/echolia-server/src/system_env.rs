//! Production Environment implementation using system time and RNG.

use chrono::{DateTime, Utc};
use echolia_core::env::Environment;

/// Production environment: real UTC clock and OS cryptographic RNG.
///
/// # Security
///
/// Randomness comes from getrandom (`/dev/urandom` on Linux,
/// `BCryptGenRandom` on Windows) and becomes AEAD nonces and private
/// scalars.
///
/// # Panics
///
/// Panics if the OS RNG fails. This is intentional: a gateway without
/// functioning cryptographic randomness cannot operate securely, and RNG
/// failure indicates OS-level breakage.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::getrandom(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - gateway cannot operate securely");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_are_random() {
        let env = SystemEnv::new();

        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        env.random_bytes(&mut first);
        env.random_bytes(&mut second);

        assert_ne!(first, second);
    }

    #[test]
    fn clock_is_utc_and_advances_monotonically_enough() {
        let env = SystemEnv::new();
        let earlier = env.now_utc();
        let later = env.now_utc();
        assert!(later >= earlier);
    }
}
