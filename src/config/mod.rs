//! Configuration module for the institution crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use institution_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CountryEntry, CrawlerConfig, EndpointConfig, OutputConfig, QueryConfig, RulesConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
