//! In-memory quota store for testing and simulation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use echolia_core::quota::{QuotaError, QuotaStore};

/// One counter row.
#[derive(Debug, Clone, Copy)]
struct QuotaRow {
    count: u64,
    last_update: DateTime<Utc>,
}

/// In-memory quota store.
///
/// All state sits behind `Arc<Mutex<..>>` so clones share one ledger.
/// Thread-safe through the mutex; uses `lock().expect()`, which panics if
/// the mutex is poisoned. Acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryQuotaStore {
    rows: Arc<Mutex<HashMap<(String, String), QuotaRow>>>,
}

impl MemoryQuotaStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows. Useful for retention assertions in tests.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("mutex poisoned").len()
    }

    /// Last-update instant of a row, if it exists.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn last_update(&self, principal: &str, date: &str) -> Option<DateTime<Utc>> {
        let rows = self.rows.lock().expect("mutex poisoned");
        rows.get(&(principal.to_string(), date.to_string())).map(|row| row.last_update)
    }
}

impl QuotaStore for MemoryQuotaStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn increment(
        &self,
        principal: &str,
        date: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, QuotaError> {
        let mut rows = self.rows.lock().expect("mutex poisoned");
        let row = rows
            .entry((principal.to_string(), date.to_string()))
            .or_insert(QuotaRow { count: 0, last_update: now });

        row.count += 1;
        row.last_update = now;
        Ok(row.count)
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned. Acceptable for test
    /// code.
    #[allow(clippy::expect_used)]
    fn count(&self, principal: &str, date: &str) -> Result<u64, QuotaError> {
        let rows = self.rows.lock().expect("mutex poisoned");
        Ok(rows.get(&(principal.to_string(), date.to_string())).map_or(0, |row| row.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_returns_post_increment_count() {
        let store = MemoryQuotaStore::new();
        let now = Utc::now();

        assert_eq!(store.increment("u1", "2026-03-01", now).unwrap(), 1);
        assert_eq!(store.increment("u1", "2026-03-01", now).unwrap(), 2);
        assert_eq!(store.count("u1", "2026-03-01").unwrap(), 2);
    }

    #[test]
    fn rows_are_keyed_by_principal_and_date() {
        let store = MemoryQuotaStore::new();
        let now = Utc::now();

        store.increment("u1", "2026-03-01", now).unwrap();
        store.increment("u1", "2026-03-02", now).unwrap();
        store.increment("u2", "2026-03-01", now).unwrap();

        assert_eq!(store.row_count(), 3);
        assert_eq!(store.count("u1", "2026-03-01").unwrap(), 1);
        assert_eq!(store.count("u2", "2026-03-02").unwrap(), 0);
    }

    #[test]
    fn increment_records_the_update_instant() {
        let store = MemoryQuotaStore::new();
        let now = Utc::now();

        store.increment("u1", "2026-03-01", now).unwrap();
        assert_eq!(store.last_update("u1", "2026-03-01"), Some(now));
    }

    #[test]
    fn clones_share_the_ledger() {
        let store = MemoryQuotaStore::new();
        let clone = store.clone();
        let now = Utc::now();

        store.increment("u1", "2026-03-01", now).unwrap();
        assert_eq!(clone.count("u1", "2026-03-01").unwrap(), 1);
    }
}
