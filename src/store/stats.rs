//! Shared crawl counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters shared by every worker
///
/// Each counter is independent, so relaxed ordering is sufficient; readers
/// only ever need an approximate live view and an exact view once all
/// workers have finished.
#[derive(Debug, Default)]
pub struct CrawlStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    total_found: AtomicU64,
    filtered_out: AtomicU64,
    rate_limited: AtomicU64,
    errors: AtomicU64,
    max_offset_reached: AtomicU64,
    queries_skipped: AtomicU64,
}

/// Point-in-time copy of the counters plus the store totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub total_found: u64,
    pub institutions_saved: u64,
    pub duplicates_removed: u64,
    pub filtered_out: u64,
    pub rate_limited: u64,
    pub errors: u64,
    pub max_offset_reached: u64,
    pub queries_skipped: u64,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request and returns its zero-based sequence number
    pub fn record_request(&self) -> u64 {
        self.total_requests.fetch_add(1, Ordering::Relaxed)
    }

    pub fn record_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_found(&self, count: u64) {
        self.total_found.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.filtered_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offset_cap(&self) {
        self.max_offset_reached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_query(&self) {
        self.queries_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Copies the counters, combining them with the store's own totals
    pub fn snapshot(&self, saved: u64, duplicates: u64) -> StatsSnapshot {
        StatsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            total_found: self.total_found.load(Ordering::Relaxed),
            institutions_saved: saved,
            duplicates_removed: duplicates,
            filtered_out: self.filtered_out.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            max_offset_reached: self.max_offset_reached.load(Ordering::Relaxed),
            queries_skipped: self.queries_skipped.load(Ordering::Relaxed),
        }
    }
}
