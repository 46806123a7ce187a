//! Output module for persisting and reporting crawl results
//!
//! This module handles:
//! - Deriving the snapshot path from the target country
//! - Writing ASCII-safe JSON snapshots (checkpoints and the final write)
//! - Reading snapshots back and summarizing them

mod json;
pub mod stats;

pub use json::{escape_non_ascii, load_snapshot, write_snapshot};
pub use stats::{print_report, print_summary, summarize, SnapshotSummary};

use crate::config::OutputConfig;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing snapshots
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Path of the snapshot file for `country`
///
/// # Example
///
/// ```
/// use institution_crawler::config::OutputConfig;
/// use institution_crawler::output::output_path;
///
/// let config = OutputConfig {
///     directory: "data".to_string(),
///     file_prefix: "schools".to_string(),
/// };
/// assert_eq!(output_path(&config, "US"), std::path::Path::new("data/schools_us.json"));
/// ```
pub fn output_path(config: &OutputConfig, country: &str) -> PathBuf {
    PathBuf::from(&config.directory).join(format!(
        "{}_{}.json",
        config.file_prefix,
        country.to_ascii_lowercase()
    ))
}
