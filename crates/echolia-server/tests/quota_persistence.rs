//! Durability and atomicity tests for the redb quota store.
//!
//! Counters must survive database close/reopen cycles (server restarts),
//! and concurrent reservations must never grant past the ceiling.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use echolia_core::quota::{QuotaLedger, QuotaLimits, QuotaStore, Reservation, TierSource};
use echolia_proto::Tier;
use echolia_server::storage::RedbQuotaStore;
use tempfile::tempdir;

#[derive(Clone)]
struct AllFree;

impl TierSource for AllFree {
    fn tier_of(&self, _principal: &str) -> Result<Tier, echolia_core::quota::QuotaError> {
        Ok(Tier::Free)
    }
}

#[test]
fn counters_survive_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("quota.redb");
    let now = Utc::now();

    // Record usage, then simulate clean shutdown.
    {
        let store = RedbQuotaStore::open(&db_path).unwrap();
        for _ in 0..7 {
            store.increment("u1", "2026-03-01", now).unwrap();
        }
        store.increment("u2", "2026-03-01", now).unwrap();
        // Database dropped
    }

    // Reopen and verify all counts.
    {
        let store = RedbQuotaStore::open(&db_path).unwrap();
        assert_eq!(store.count("u1", "2026-03-01").unwrap(), 7);
        assert_eq!(store.count("u2", "2026-03-01").unwrap(), 1);
        assert_eq!(store.count("u3", "2026-03-01").unwrap(), 0);
    }
}

#[test]
fn past_date_rows_are_untouched_by_new_days() {
    let dir = tempdir().unwrap();
    let store = RedbQuotaStore::open(dir.path().join("quota.redb")).unwrap();
    let now = Utc::now();

    for _ in 0..3 {
        store.increment("u1", "2026-03-01", now).unwrap();
    }
    store.increment("u1", "2026-03-02", now).unwrap();

    assert_eq!(store.count("u1", "2026-03-01").unwrap(), 3);
    assert_eq!(store.count("u1", "2026-03-02").unwrap(), 1);
}

#[test]
fn concurrent_increments_observe_distinct_counts() {
    let dir = tempdir().unwrap();
    let store = RedbQuotaStore::open(dir.path().join("quota.redb")).unwrap();
    let seen = Arc::new(Mutex::new(HashSet::new()));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let seen = Arc::clone(&seen);
            thread::spawn(move || {
                for _ in 0..5 {
                    let count = store.increment("u1", "2026-03-01", Utc::now()).unwrap();
                    assert!(
                        seen.lock().unwrap().insert(count),
                        "two increments observed the same count"
                    );
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.count("u1", "2026-03-01").unwrap(), 40);
}

#[test]
fn concurrent_reservations_never_grant_past_the_ceiling() {
    let dir = tempdir().unwrap();
    let store = RedbQuotaStore::open(dir.path().join("quota.redb")).unwrap();
    let limits = QuotaLimits { free_daily_limit: 10, elevated_daily_limit: 5_000 };
    let ledger = Arc::new(QuotaLedger::new(store.clone(), AllFree, limits));
    let now = Utc::now();

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                matches!(ledger.reserve("u1", now).unwrap(), Reservation::Granted(_))
            })
        })
        .collect();

    let grants = handles.into_iter().map(|handle| handle.join().unwrap()).filter(|&granted| granted).count();

    assert_eq!(grants, 10, "exactly the ceiling may be granted");

    // Every attempt recorded its increment, grants and rejections alike.
    let date = echolia_core::quota::date_key(now);
    assert_eq!(store.count("u1", &date).unwrap(), 25);
}
