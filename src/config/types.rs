use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the institution crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub endpoint: EndpointConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub queries: QueryConfig,
    #[serde(default, rename = "country")]
    pub countries: Vec<CountryEntry>,
}

impl Config {
    /// Returns the extra query keywords configured for the target country
    pub fn country_keywords(&self) -> &[String] {
        self.countries
            .iter()
            .find(|entry| entry.code.eq_ignore_ascii_case(&self.endpoint.country))
            .map(|entry| entry.keywords.as_slice())
            .unwrap_or(&[])
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of queries processed concurrently
    pub workers: u32,

    /// Number of records requested per page
    pub page_size: u32,

    /// Offset at which pagination of a single query stops
    pub max_offset: u32,

    /// Number of empty (or short) pages that ends a query
    pub max_consecutive_empty: u32,

    /// Delay between successive page fetches of one query (milliseconds)
    pub page_delay_ms: u64,

    /// Cooldown after an HTTP 429 response (milliseconds)
    pub rate_limit_cooldown_ms: u64,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Interval between checkpoint writes (seconds)
    pub checkpoint_interval_secs: u64,

    /// Queries longer than this are skipped
    pub max_query_length: usize,
}

impl CrawlerConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_millis(self.rate_limit_cooldown_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            page_size: 100,
            max_offset: 1000,
            max_consecutive_empty: 2,
            page_delay_ms: 100,
            rate_limit_cooldown_ms: 500,
            request_timeout_secs: 10,
            checkpoint_interval_secs: 20,
            max_query_length: 10,
        }
    }
}

/// Remote search endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EndpointConfig {
    /// Base URL of the institution search endpoint
    pub url: String,

    /// ISO 3166-1 alpha-2 country code sent with every request
    pub country: String,

    /// Locale parameter sent with every request
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_locale() -> String {
    "en-us".to_string()
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the crawler
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,

    /// Email address for crawler-related contact
    pub contact_email: String,

    /// Additional user agent strings rotated after the identifying one
    #[serde(default)]
    pub rotation: Vec<String>,
}

impl UserAgentConfig {
    /// Formats the identifying agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn identity(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }

    /// The full rotation pool, identifying agent first
    pub fn pool(&self) -> Vec<String> {
        std::iter::once(self.identity())
            .chain(self.rotation.iter().cloned())
            .collect()
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory the snapshot file is written to
    pub directory: String,

    /// File name prefix; the country code is appended
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_prefix: "institutions".to_string(),
        }
    }
}

/// Classification rules
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RulesConfig {
    /// Type tags that mark a record as wanted
    pub allowed_types: Vec<String>,

    /// Type tags that always reject a record
    pub excluded_types: Vec<String>,

    /// Name keywords accepted when a record carries no type tags
    pub allowed_name_keywords: Vec<String>,

    /// Name keywords rejected when a record carries no type tags
    pub excluded_name_keywords: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            allowed_types: owned(&[
                "K12",
                "PRIMARY",
                "SECONDARY",
                "MIDDLE_SCHOOL",
                "HIGH_SCHOOL",
                "ELEMENTARY",
                "SCHOOL",
            ]),
            excluded_types: owned(&[
                "UNIVERSITY",
                "COLLEGE",
                "HIGHER_EDUCATION",
                "COMMUNITY_COLLEGE",
                "TECHNICAL_COLLEGE",
                "VOCATIONAL_SCHOOL",
                "GRADUATE_SCHOOL",
                "MEDICAL_SCHOOL",
                "LAW_SCHOOL",
                "BUSINESS_SCHOOL",
                "POST_SECONDARY",
                "GOVERNMENT",
                "MILITARY",
                "CORPORATION",
                "NON_PROFIT",
                "HEALTHCARE",
                "LIBRARY",
                "OTHER",
                "UNKNOWN",
            ]),
            allowed_name_keywords: Vec::new(),
            excluded_name_keywords: Vec::new(),
        }
    }
}

/// Query plan configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueryConfig {
    /// Number of single-letter queries, starting at 'a'
    pub letters: usize,

    /// Letters used as the first character of bigram queries
    pub bigram_first: usize,

    /// Letters used as the second character of bigram queries
    pub bigram_second: usize,

    /// Domain keywords queried for every country
    pub keywords: Vec<String>,

    /// Whether the empty query is part of the plan
    pub include_empty: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            letters: 10,
            bigram_first: 5,
            bigram_second: 3,
            keywords: [
                "school",
                "academy",
                "high school",
                "middle",
                "elementary",
                "secondary",
                "primary",
                "prep",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            include_empty: true,
        }
    }
}

/// Per-country query keywords
#[derive(Debug, Clone, Deserialize)]
pub struct CountryEntry {
    /// ISO 3166-1 alpha-2 country code
    pub code: String,

    /// Keywords appended to the query plan for this country
    #[serde(default)]
    pub keywords: Vec<String>,
}
