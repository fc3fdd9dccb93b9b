//! Environment abstraction for deterministic testing.
//!
//! Decouples the pipeline from system resources (wall clock, randomness).
//! Production uses the real UTC clock and the OS CSPRNG; tests use a
//! settable clock and a seeded generator so rotation schedules and date
//! boundaries can be driven explicitly.
//!
//! Unlike a monotonic-instant environment, everything here is wall-clock
//! UTC: quota date keys, key expiry, and reset instants are all calendar
//! facts.

use chrono::{DateTime, Utc};

/// Abstract environment providing UTC time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production;
///   its output becomes nonces and private scalars
/// - `now_utc()` reflects real UTC in production (quota resets and key
///   expiry are protocol-visible)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current UTC wall-clock time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Fill the buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generate a random fixed-size array.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }
}

/// Deterministic environment for tests.
///
/// Not suitable for production: the generator is seeded and fully
/// predictable.
pub mod test_utils {
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::Environment;

    /// Test environment with a settable clock and a seeded generator.
    #[derive(Clone)]
    pub struct MockEnv {
        now_micros: Arc<AtomicI64>,
        rng_state: Arc<AtomicU64>,
    }

    impl MockEnv {
        /// Create an environment pinned at the given instant.
        pub fn at(now: DateTime<Utc>) -> Self {
            Self {
                now_micros: Arc::new(AtomicI64::new(now.timestamp_micros())),
                rng_state: Arc::new(AtomicU64::new(0x9E37_79B9_7F4A_7C15)),
            }
        }

        /// Create an environment at a fixed reference instant
        /// (2026-03-01T12:00:00Z) with the default seed.
        pub fn new() -> Self {
            Self::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
        }

        /// Reseed the generator.
        pub fn with_seed(self, seed: u64) -> Self {
            self.rng_state.store(seed, Ordering::SeqCst);
            self
        }

        /// Pin the clock to a new instant.
        pub fn set_now(&self, now: DateTime<Utc>) {
            self.now_micros.store(now.timestamp_micros(), Ordering::SeqCst);
        }

        /// Advance the clock.
        pub fn advance(&self, by: Duration) {
            self.now_micros.fetch_add(by.num_microseconds().unwrap_or(i64::MAX), Ordering::SeqCst);
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Environment for MockEnv {
        fn now_utc(&self) -> DateTime<Utc> {
            let micros = self.now_micros.load(Ordering::SeqCst);
            DateTime::from_timestamp_micros(micros).unwrap_or_default()
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            // SplitMix64 stream; deterministic given the seed.
            for chunk in buffer.chunks_mut(8) {
                let mut z = self.rng_state.fetch_add(0x9E37_79B9_7F4A_7C15, Ordering::SeqCst);
                z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
                z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
                z ^= z >> 31;
                let bytes = z.to_le_bytes();
                chunk.copy_from_slice(&bytes[..chunk.len()]);
            }
        }
    }

}
