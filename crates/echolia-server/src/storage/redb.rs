//! Redb-backed durable quota store.
//!
//! Uses redb's ACID write transactions for the increment: read the
//! current row, bump it, commit. Write transactions serialize, which
//! gives the upsert single-statement atomicity — concurrent reservations
//! observe distinct post-increment counts and the ceiling is never
//! exceeded by more than the one deliberate over-count.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use echolia_core::quota::{QuotaError, QuotaStore};
use redb::{Database, ReadableTable, TableDefinition};

/// Table: daily usage counters.
/// Key: `principal_bytes || 0x00 || date_bytes` (dates are fixed
/// `YYYY-MM-DD`, principals contain no NUL).
/// Value: count (u64 BE) + last-update seconds (i64 BE).
const QUOTA: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ai_usage_quota");

const VALUE_LEN: usize = 16;

/// Durable quota store backed by redb.
///
/// Thread-safe through redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbQuotaStore {
    db: Arc<Database>,
}

impl RedbQuotaStore {
    /// Open or create the quota database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError::Storage`] if the database cannot be opened
    /// or the table cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QuotaError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        let txn = db.begin_write().map_err(storage_err)?;
        {
            let _ = txn.open_table(QUOTA).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl QuotaStore for RedbQuotaStore {
    fn increment(
        &self,
        principal: &str,
        date: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, QuotaError> {
        let txn = self.db.begin_write().map_err(storage_err)?;

        let new_count;
        {
            let mut table = txn.open_table(QUOTA).map_err(storage_err)?;
            let key = encode_row_key(principal, date);

            let current = match table.get(key.as_slice()).map_err(storage_err)? {
                Some(value) => decode_count(value.value())?,
                None => 0,
            };
            new_count = current + 1;

            let value = encode_value(new_count, now.timestamp());
            table.insert(key.as_slice(), value.as_slice()).map_err(storage_err)?;
        }

        txn.commit().map_err(storage_err)?;
        Ok(new_count)
    }

    fn count(&self, principal: &str, date: &str) -> Result<u64, QuotaError> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        let table = txn.open_table(QUOTA).map_err(storage_err)?;

        let key = encode_row_key(principal, date);
        match table.get(key.as_slice()).map_err(storage_err)? {
            Some(value) => decode_count(value.value()),
            None => Ok(0),
        }
    }
}

fn storage_err(err: impl std::fmt::Display) -> QuotaError {
    QuotaError::Storage(err.to_string())
}

fn encode_row_key(principal: &str, date: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(principal.len() + 1 + date.len());
    key.extend_from_slice(principal.as_bytes());
    key.push(0x00);
    key.extend_from_slice(date.as_bytes());
    key
}

fn encode_value(count: u64, last_update_secs: i64) -> [u8; VALUE_LEN] {
    let mut value = [0u8; VALUE_LEN];
    value[..8].copy_from_slice(&count.to_be_bytes());
    value[8..].copy_from_slice(&last_update_secs.to_be_bytes());
    value
}

fn decode_count(value: &[u8]) -> Result<u64, QuotaError> {
    let Some(bytes) = value.get(..8) else {
        return Err(QuotaError::Storage("corrupt quota row".to_string()));
    };
    let mut count = [0u8; 8];
    count.copy_from_slice(bytes);
    Ok(u64::from_be_bytes(count))
}
