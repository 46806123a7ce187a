//! Institution Crawler: a deduplicating institution-discovery crawler
//!
//! This crate enumerates a remote institution-search endpoint with a plan of
//! short queries, keeps the records that satisfy a classification ruleset,
//! and persists the unique results as a sorted JSON snapshot.

pub mod classify;
pub mod config;
pub mod crawler;
pub mod output;
pub mod query;
pub mod store;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid country code: {0}")]
    InvalidCountry(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use classify::{is_english_only, RejectReason, Ruleset, Verdict};
pub use config::Config;
pub use crawler::{CrawlReport, Coordinator};
pub use store::{CrawlStats, InstitutionId, InstitutionRecord, InstitutionStore};
