//! Quota store backends.
//!
//! The `QuotaStore` trait lives in `echolia_core::quota`; this module
//! supplies the implementations. [`MemoryQuotaStore`] backs tests and
//! simulation, [`RedbQuotaStore`] is the durable production ledger.
//!
//! Both serialize the increment — a mutex in memory, redb's
//! single-writer transactions on disk — so the increment-then-compare
//! reservation never lets two grants exceed the ceiling.

mod memory;
mod redb;

pub use self::redb::RedbQuotaStore;
pub use memory::MemoryQuotaStore;
