//! Deduplicating institution store
//!
//! This module provides:
//! - The normalized `InstitutionRecord` model
//! - `InstitutionStore`, a concurrent map keyed by institution id
//! - `CrawlStats`, the counters shared by all workers
//!
//! The store only grows during a run. Snapshots are taken while workers are
//! still inserting; each snapshot is a consistent subset of the final result
//! because nothing is ever removed or replaced.

mod record;
mod stats;

pub use record::{InstitutionId, InstitutionRecord};
pub use stats::{CrawlStats, StatsSnapshot};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct StoreInner {
    records: HashMap<String, InstitutionRecord>,
    saved: u64,
    duplicates: u64,
}

/// Thread-safe mapping from institution id to record
///
/// A single lock covers the map and its counters so the presence check and
/// the insert happen as one step.
#[derive(Debug, Default)]
pub struct InstitutionStore {
    inner: Mutex<StoreInner>,
}

impl InstitutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Inserts cannot leave the map half-updated, so a poisoned lock is
        // still safe to use.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Inserts a record unless its id is already present
    ///
    /// # Returns
    ///
    /// * `true` - The record was new and has been stored
    /// * `false` - The id was already stored; the record is discarded and the
    ///   duplicate counter incremented
    pub fn try_insert(&self, record: InstitutionRecord) -> bool {
        let key = record.id.key();
        let mut inner = self.lock();
        if inner.records.contains_key(&key) {
            inner.duplicates += 1;
            return false;
        }
        inner.records.insert(key, record);
        inner.saved += 1;
        true
    }

    /// Returns all records sorted by case-insensitive name, then by id
    pub fn snapshot(&self) -> Vec<InstitutionRecord> {
        let mut records: Vec<InstitutionRecord> = {
            let inner = self.lock();
            inner.records.values().cloned().collect()
        };
        records.sort_by_cached_key(|r| (r.sort_key(), r.id.key()));
        records
    }

    pub fn contains(&self, id: &InstitutionId) -> bool {
        self.lock().records.contains_key(&id.key())
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of records accepted into the store
    pub fn saved(&self) -> u64 {
        self.lock().saved
    }

    /// Number of observations discarded because their id was already stored
    pub fn duplicates(&self) -> u64 {
        self.lock().duplicates
    }
}
