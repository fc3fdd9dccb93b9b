//! Daily request quota accounting.
//!
//! Enforces per-principal daily ceilings with increment-then-compare
//! semantics: [`QuotaLedger::reserve`] atomically bumps today's counter
//! and only then checks the ceiling. A rejected request keeps its
//! increment — the worst case is one extra count recorded on a request
//! that did no work, and in exchange the hot path needs no transaction
//! beyond the store's single atomic upsert.
//!
//! # Invariants
//!
//! - Counts never decrease; rows for past UTC dates are immutable once the
//!   day boundary passes (nothing writes to them again).
//! - Concurrent `reserve` calls against a ceiling `c` produce at most `c`
//!   grants, provided the store serializes `increment`.
//! - The ledger never grants on a storage error.

use chrono::{DateTime, Days, NaiveTime, SecondsFormat, Utc};
use echolia_proto::{Tier, UsageInfo};
use thiserror::Error;

/// Error from the quota store or the entitlement source.
///
/// Always transient from the pipeline's point of view: the orchestrator
/// maps it to a server error without running any later step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    /// The underlying storage failed.
    #[error("quota storage unavailable: {0}")]
    Storage(String),
}

/// Storage abstraction for daily counters.
///
/// Must be `Clone` (shared across request tasks), `Send + Sync`, and
/// synchronous; implementations typically share internal state via `Arc`.
/// The single correctness requirement is that `increment` is atomic: two
/// concurrent calls for the same `(principal, date)` row observe distinct
/// post-increment counts.
pub trait QuotaStore: Clone + Send + Sync + 'static {
    /// Atomically increment the row for `(principal, date)`, creating it
    /// at zero first if absent, and return the post-increment count.
    ///
    /// `now` is recorded as the row's last-update instant.
    fn increment(
        &self,
        principal: &str,
        date: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, QuotaError>;

    /// Current count for `(principal, date)`; zero if no row exists.
    fn count(&self, principal: &str, date: &str) -> Result<u64, QuotaError>;
}

/// External entitlement lookup: which tier a principal is on.
pub trait TierSource: Send + Sync + 'static {
    /// Resolve the principal's tier.
    fn tier_of(&self, principal: &str) -> Result<Tier, QuotaError>;
}

/// Daily ceilings per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaLimits {
    /// Ceiling for [`Tier::Free`].
    pub free_daily_limit: u64,
    /// Ceiling for [`Tier::Elevated`]. High but bounded, as an anti-abuse
    /// backstop.
    pub elevated_daily_limit: u64,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self { free_daily_limit: 10, elevated_daily_limit: 5_000 }
    }
}

impl QuotaLimits {
    /// Ceiling for the given tier.
    pub fn ceiling(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Free => self.free_daily_limit,
            Tier::Elevated => self.elevated_daily_limit,
        }
    }
}

/// A principal's standing at some instant. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSnapshot {
    /// Requests left today; never negative.
    pub requests_remaining: u64,
    /// Next UTC midnight.
    pub reset_at: DateTime<Utc>,
    /// Tier the ceiling was computed from.
    pub tier: Tier,
}

impl UsageSnapshot {
    /// Wire representation with an RFC 3339 reset instant.
    pub fn to_wire(&self) -> UsageInfo {
        UsageInfo {
            requests_remaining: self.requests_remaining,
            reset_at: self.reset_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            tier: self.tier,
        }
    }
}

/// Outcome of a reservation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    /// The request may proceed; the snapshot reflects the post-increment
    /// count.
    Granted(UsageSnapshot),
    /// The ceiling was reached. The increment is NOT rolled back.
    Exhausted(UsageSnapshot),
}

/// UTC date key for a quota row, `YYYY-MM-DD`.
pub fn date_key(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d").to_string()
}

/// The instant the daily counters reset: next UTC midnight.
pub fn next_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(tomorrow) = now.date_naive().checked_add_days(Days::new(1)) else {
        unreachable!("UTC dates do not overflow within the supported range");
    };
    tomorrow.and_time(NaiveTime::MIN).and_utc()
}

/// Quota ledger over a store and an entitlement source.
pub struct QuotaLedger<S, T> {
    store: S,
    tiers: T,
    limits: QuotaLimits,
}

impl<S: QuotaStore, T: TierSource> QuotaLedger<S, T> {
    /// Build a ledger.
    pub fn new(store: S, tiers: T, limits: QuotaLimits) -> Self {
        Self { store, tiers, limits }
    }

    /// Read-only standing for a principal. Does not mutate.
    pub fn peek(&self, principal: &str, now: DateTime<Utc>) -> Result<UsageSnapshot, QuotaError> {
        let tier = self.tiers.tier_of(principal)?;
        let used = self.store.count(principal, &date_key(now))?;

        Ok(UsageSnapshot {
            requests_remaining: self.limits.ceiling(tier).saturating_sub(used),
            reset_at: next_reset(now),
            tier,
        })
    }

    /// Atomically reserve one request.
    ///
    /// Increment-then-compare: the counter is bumped first, and if the
    /// post-increment count exceeds the ceiling the outcome is
    /// [`Reservation::Exhausted`] with the increment preserved.
    pub fn reserve(&self, principal: &str, now: DateTime<Utc>) -> Result<Reservation, QuotaError> {
        let tier = self.tiers.tier_of(principal)?;
        let ceiling = self.limits.ceiling(tier);
        let count = self.store.increment(principal, &date_key(now), now)?;

        let snapshot = UsageSnapshot {
            requests_remaining: ceiling.saturating_sub(count),
            reset_at: next_reset(now),
            tier,
        };

        if count > ceiling {
            tracing::warn!(principal, tier = tier.as_str(), "daily quota exhausted");
            Ok(Reservation::Exhausted(snapshot))
        } else {
            Ok(Reservation::Granted(snapshot))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::TimeZone;

    use super::*;

    #[derive(Clone, Default)]
    struct MapStore {
        rows: Arc<Mutex<HashMap<(String, String), u64>>>,
    }

    impl QuotaStore for MapStore {
        fn increment(
            &self,
            principal: &str,
            date: &str,
            _now: DateTime<Utc>,
        ) -> Result<u64, QuotaError> {
            let mut rows = self.rows.lock().expect("mutex poisoned");
            let count = rows.entry((principal.to_string(), date.to_string())).or_insert(0);
            *count += 1;
            Ok(*count)
        }

        fn count(&self, principal: &str, date: &str) -> Result<u64, QuotaError> {
            let rows = self.rows.lock().expect("mutex poisoned");
            Ok(*rows.get(&(principal.to_string(), date.to_string())).unwrap_or(&0))
        }
    }

    struct AllFree;

    impl TierSource for AllFree {
        fn tier_of(&self, _principal: &str) -> Result<Tier, QuotaError> {
            Ok(Tier::Free)
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 45).unwrap()
    }

    fn ledger() -> QuotaLedger<MapStore, AllFree> {
        QuotaLedger::new(MapStore::default(), AllFree, QuotaLimits::default())
    }

    #[test]
    fn date_key_is_utc_calendar_date() {
        assert_eq!(date_key(noon()), "2026-03-01");
    }

    #[test]
    fn reset_is_next_utc_midnight() {
        let reset = next_reset(noon());
        assert_eq!(reset, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn first_reservation_leaves_ceiling_minus_one() {
        let ledger = ledger();
        let Reservation::Granted(snapshot) = ledger.reserve("u1", noon()).unwrap() else {
            panic!("expected grant");
        };
        assert_eq!(snapshot.requests_remaining, 9);
        assert_eq!(snapshot.tier, Tier::Free);
    }

    #[test]
    fn reservation_past_ceiling_is_exhausted_and_not_rolled_back() {
        let ledger = ledger();
        for _ in 0..10 {
            assert!(matches!(ledger.reserve("u2", noon()).unwrap(), Reservation::Granted(_)));
        }

        let Reservation::Exhausted(snapshot) = ledger.reserve("u2", noon()).unwrap() else {
            panic!("expected exhaustion");
        };
        assert_eq!(snapshot.requests_remaining, 0);

        // The over-count stays recorded.
        assert_eq!(ledger.store.count("u2", &date_key(noon())).unwrap(), 11);
    }

    #[test]
    fn peek_does_not_mutate() {
        let ledger = ledger();
        ledger.reserve("u3", noon()).unwrap();

        let before = ledger.peek("u3", noon()).unwrap();
        let after = ledger.peek("u3", noon()).unwrap();
        assert_eq!(before, after);
        assert_eq!(before.requests_remaining, 9);
    }

    #[test]
    fn counters_reset_across_the_day_boundary() {
        let ledger = ledger();
        for _ in 0..10 {
            ledger.reserve("u4", noon()).unwrap();
        }
        assert!(matches!(ledger.reserve("u4", noon()).unwrap(), Reservation::Exhausted(_)));

        let next_day = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 1).unwrap();
        assert!(matches!(ledger.reserve("u4", next_day).unwrap(), Reservation::Granted(_)));
    }

    #[test]
    fn counts_are_monotonic() {
        let ledger = ledger();
        let mut last = 0;
        for _ in 0..25 {
            ledger.reserve("u5", noon()).unwrap();
            let count = ledger.store.count("u5", &date_key(noon())).unwrap();
            assert!(count > last);
            last = count;
        }
    }
}
