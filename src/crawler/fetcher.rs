//! HTTP fetcher implementation
//!
//! This module handles all requests to the institution search endpoint:
//! - Building the HTTP client with per-call timeouts
//! - Rotating user agent strings across requests
//! - Classifying responses into page, malformed, rate-limited or failed
//!
//! Fetching never returns an error. Every failure mode degrades to "no
//! results for this page" and is accounted for in [`CrawlStats`].

use crate::config::{CrawlerConfig, EndpointConfig, UserAgentConfig};
use crate::store::CrawlStats;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of fetching one page of search results
#[derive(Debug)]
pub enum FetchOutcome {
    /// HTTP 200 with a JSON body; raw institution objects
    Page(Vec<Value>),

    /// HTTP 200 whose body was not JSON
    Malformed,

    /// HTTP 429
    RateLimited,

    /// Any other status, timeout, or transport error
    Failed {
        /// Error description
        reason: String,
    },
}

impl FetchOutcome {
    /// The page's items; every non-page outcome is an empty page
    pub fn into_items(self) -> Vec<Value> {
        match self {
            FetchOutcome::Page(items) => items,
            _ => Vec::new(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchOutcome::RateLimited)
    }
}

/// Builds an HTTP client with proper configuration
///
/// The user agent is set per request, so the client only carries the
/// headers that never change.
///
/// # Arguments
///
/// * `config` - Crawler settings providing the request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let timeout = config.request_timeout();
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues search requests against the configured endpoint
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    endpoint: EndpointConfig,
    user_agents: Arc<Vec<HeaderValue>>,
    stats: Arc<CrawlStats>,
}

impl Fetcher {
    /// Creates a fetcher sharing the given counters
    pub fn new(
        crawler: &CrawlerConfig,
        endpoint: EndpointConfig,
        user_agent: &UserAgentConfig,
        stats: Arc<CrawlStats>,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(crawler)?;
        let mut user_agents: Vec<HeaderValue> = user_agent
            .pool()
            .iter()
            .filter_map(|agent| match HeaderValue::from_str(agent) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring user agent with invalid characters: {:?}", agent);
                    None
                }
            })
            .collect();
        if user_agents.is_empty() {
            user_agents.push(HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )));
        }

        Ok(Self {
            client,
            endpoint,
            user_agents: Arc::new(user_agents),
            stats,
        })
    }

    /// The counters this fetcher reports into
    pub fn stats(&self) -> &Arc<CrawlStats> {
        &self.stats
    }

    /// Fetches one page of results for `query`
    ///
    /// Sends `country`, `name`, `offset`, `limit`, `locale` and a millisecond
    /// timestamp `_` for cache busting.
    ///
    /// # Response Handling
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | HTTP 200, JSON array | `Page(array)` |
    /// | HTTP 200, JSON object | `Page(object.data)` or empty page |
    /// | HTTP 200, not JSON | `Malformed` |
    /// | HTTP 429 | `RateLimited` |
    /// | Other status | `Failed` |
    /// | Timeout / connection error | `Failed` |
    pub async fn fetch_page(&self, query: &str, offset: u32, limit: u32) -> FetchOutcome {
        let sequence = self.stats.record_request();
        let agent = &self.user_agents[(sequence % self.user_agents.len() as u64) as usize];

        let params = [
            ("country", self.endpoint.country.clone()),
            ("name", query.to_string()),
            ("offset", offset.to_string()),
            ("limit", limit.to_string()),
            ("locale", self.endpoint.locale.clone()),
            ("_", cache_buster().to_string()),
        ];

        let response = match self
            .client
            .get(&self.endpoint.url)
            .query(&params)
            .header(USER_AGENT, agent.clone())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return self.failed(query, offset, describe_error(&e)),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            self.stats.record_rate_limited();
            tracing::debug!("Rate limited on query {:?} at offset {}", query, offset);
            return FetchOutcome::RateLimited;
        }

        if status != StatusCode::OK {
            return self.failed(query, offset, format!("HTTP {}", status.as_u16()));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return self.failed(query, offset, describe_error(&e)),
        };

        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => {
                self.stats.record_success();
                FetchOutcome::Page(unwrap_envelope(value))
            }
            Err(e) => {
                tracing::debug!(
                    "Unparseable body for query {:?} at offset {}: {}",
                    query,
                    offset,
                    e
                );
                FetchOutcome::Malformed
            }
        }
    }

    fn failed(&self, query: &str, offset: u32, reason: String) -> FetchOutcome {
        self.stats.record_error();
        tracing::debug!(
            "Request for query {:?} at offset {} failed: {}",
            query,
            offset,
            reason
        );
        FetchOutcome::Failed { reason }
    }
}

/// Extracts the result list from a response body
///
/// Arrays are used as-is; objects are unwrapped through their `data` array.
/// Any other shape is treated as an empty page.
pub fn unwrap_envelope(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn cache_buster() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else {
        e.to_string()
    }
}
