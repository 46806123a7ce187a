//! Per-query pagination
//!
//! Each query walks the endpoint's result pages sequentially. A
//! [`PageCursor`] tracks the offset and the run of empty or short pages; the
//! async [`crawl_query`] drives it against the fetcher and feeds every page
//! through normalization, classification and the store.

use crate::classify::{Ruleset, Verdict};
use crate::config::CrawlerConfig;
use crate::crawler::fetcher::Fetcher;
use crate::query::exceeds_query_length;
use crate::store::{InstitutionRecord, InstitutionStore};
use chrono::Utc;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Pagination state for a single query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    offset: u32,
    consecutive_empty: u32,
    page_size: u32,
    max_offset: u32,
    max_consecutive_empty: u32,
}

impl PageCursor {
    pub fn new(page_size: u32, max_offset: u32, max_consecutive_empty: u32) -> Self {
        Self {
            offset: 0,
            consecutive_empty: 0,
            page_size: page_size.max(1),
            max_offset,
            max_consecutive_empty: max_consecutive_empty.max(1),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(
            config.page_size,
            config.max_offset,
            config.max_consecutive_empty,
        )
    }

    /// Offset of the next page to fetch
    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    /// Records a fetched page of `items` results and advances the offset
    ///
    /// An empty page, or one shorter than half the page size, extends the
    /// empty run; a fuller page resets it.
    pub fn record(&mut self, items: usize) {
        let short_page = (items as u64) * 2 < u64::from(self.page_size);
        if items == 0 || short_page {
            self.consecutive_empty += 1;
        } else {
            self.consecutive_empty = 0;
        }
        self.offset = self.offset.saturating_add(self.page_size);
    }

    pub fn exhausted(&self) -> bool {
        self.consecutive_empty >= self.max_consecutive_empty
    }

    pub fn hit_offset_cap(&self) -> bool {
        self.offset >= self.max_offset
    }

    pub fn is_done(&self) -> bool {
        self.exhausted() || self.hit_offset_cap()
    }

    /// Upper bound on the fetches any query can make
    pub fn max_fetches(&self) -> u32 {
        self.max_offset.div_ceil(self.page_size)
    }
}

/// How a query's pagination ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// Empty/short page threshold reached
    Completed,
    /// Offset cap reached while pages were still full
    OffsetCapReached,
    /// Query longer than the configured maximum; nothing fetched
    Skipped,
    /// Shutdown requested before the query finished
    Interrupted,
}

/// Summary of one worker task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub query: String,
    pub pages_fetched: u32,
    pub accepted: u64,
    pub status: QueryStatus,
}

impl QueryOutcome {
    pub fn new(query: &str, status: QueryStatus) -> Self {
        Self {
            query: query.to_string(),
            pages_fetched: 0,
            accepted: 0,
            status,
        }
    }
}

/// Everything a worker needs, shared by reference between all workers
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub fetcher: Fetcher,
    pub ruleset: Arc<Ruleset>,
    pub store: Arc<InstitutionStore>,
    pub crawler: Arc<CrawlerConfig>,
    pub country: String,
    pub shutdown: Arc<AtomicBool>,
}

impl QueryContext {
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Normalizes, classifies and stores one page; returns how many were new
    pub fn process_page(&self, items: &[Value], query: &str) -> u64 {
        let stats = self.fetcher.stats();
        let today = Utc::now().date_naive();
        let mut accepted = 0;

        for raw in items {
            let Some(record) = InstitutionRecord::from_raw(raw, &self.country, query, today)
            else {
                continue;
            };
            stats.record_found(1);

            match self.ruleset.classify(&record) {
                Verdict::Accept => {
                    if self.store.try_insert(record) {
                        accepted += 1;
                    }
                }
                Verdict::Reject(reason) => {
                    tracing::trace!("Filtered {:?} ({:?})", record.name, reason);
                    stats.record_filtered();
                }
            }
        }

        accepted
    }
}

/// Runs the full pagination loop for one query
///
/// Never fails: fetch errors are empty pages, and the cursor bounds the
/// number of fetches regardless of how the endpoint behaves.
pub async fn crawl_query(ctx: &QueryContext, query: &str) -> QueryOutcome {
    let stats = ctx.fetcher.stats();

    if exceeds_query_length(query, ctx.crawler.max_query_length) {
        stats.record_skipped_query();
        tracing::debug!("Skipping overlong query {:?}", query);
        return QueryOutcome::new(query, QueryStatus::Skipped);
    }

    let mut cursor = PageCursor::from_config(&ctx.crawler);
    let mut outcome = QueryOutcome::new(query, QueryStatus::Completed);

    while !cursor.is_done() {
        if ctx.shutdown_requested() {
            outcome.status = QueryStatus::Interrupted;
            return outcome;
        }

        if outcome.pages_fetched > 0 && !ctx.crawler.page_delay().is_zero() {
            tokio::time::sleep(ctx.crawler.page_delay()).await;
        }

        let fetched = ctx
            .fetcher
            .fetch_page(query, cursor.offset(), cursor.page_size())
            .await;
        outcome.pages_fetched += 1;

        if fetched.is_rate_limited() {
            tokio::time::sleep(ctx.crawler.rate_limit_cooldown()).await;
        }

        let items = fetched.into_items();
        if !items.is_empty() {
            outcome.accepted += ctx.process_page(&items, query);
        }
        cursor.record(items.len());
    }

    if !cursor.exhausted() {
        stats.record_offset_cap();
        outcome.status = QueryStatus::OffsetCapReached;
    }

    tracing::debug!(
        "Query {:?} finished after {} pages ({} new)",
        query,
        outcome.pages_fetched,
        outcome.accepted
    );
    outcome
}
