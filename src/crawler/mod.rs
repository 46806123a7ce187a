//! Crawler module for institution discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with failure classification
//! - Per-query pagination and record processing
//! - Worker pool coordination, checkpoints and interrupts

mod coordinator;
mod fetcher;
mod pagination;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{build_http_client, unwrap_envelope, FetchOutcome, Fetcher};
pub use pagination::{crawl_query, PageCursor, QueryContext, QueryOutcome, QueryStatus};

use crate::config::Config;
use crate::CrawlError;

/// Runs a complete crawl, stopping early on Ctrl-C
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client, ruleset and store
/// 2. Delete the previous output file
/// 3. Run every query of the plan through the worker pool
/// 4. Write checkpoints while running and a final snapshot at the end
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished (check `succeeded()` for the final write)
/// * `Err(CrawlError)` - The crawl could not be started
pub async fn crawl(config: Config) -> Result<CrawlReport, CrawlError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run(interrupt_signal()).await
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
