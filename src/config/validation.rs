use crate::config::types::{
    Config, CountryEntry, CrawlerConfig, EndpointConfig, OutputConfig, QueryConfig, RulesConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_endpoint_config(&config.endpoint)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_rules(&config.rules)?;
    validate_queries(&config.queries)?;
    validate_countries(&config.countries)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 || config.workers > 200 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 200, got {}",
            config.workers
        )));
    }

    if config.page_size < 1 || config.page_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 1000, got {}",
            config.page_size
        )));
    }

    if config.max_offset < config.page_size {
        return Err(ConfigError::Validation(format!(
            "max_offset ({}) must be >= page_size ({})",
            config.max_offset, config.page_size
        )));
    }

    if config.max_consecutive_empty < 1 {
        return Err(ConfigError::Validation(
            "max_consecutive_empty must be >= 1".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.checkpoint_interval_secs < 1 {
        return Err(ConfigError::Validation(
            "checkpoint_interval_secs must be >= 1".to_string(),
        ));
    }

    if config.max_query_length < 1 {
        return Err(ConfigError::Validation(
            "max_query_length must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates endpoint configuration
fn validate_endpoint_config(config: &EndpointConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid endpoint url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint url '{}' must use http or https",
            config.url
        )));
    }

    validate_country_code(&config.country)?;

    if config.locale.trim().is_empty() {
        return Err(ConfigError::Validation("locale cannot be empty".to_string()));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    if let Some(agent) = config.rotation.iter().find(|a| a.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "rotation entries cannot be empty, got '{}'",
            agent
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty()
        || config
            .file_prefix
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
    {
        return Err(ConfigError::Validation(format!(
            "file_prefix must be a non-empty file name without separators, got '{}'",
            config.file_prefix
        )));
    }

    Ok(())
}

/// Validates that tag and keyword sets are non-overlapping
fn validate_rules(config: &RulesConfig) -> Result<(), ConfigError> {
    if config.allowed_types.is_empty() && config.allowed_name_keywords.is_empty() {
        return Err(ConfigError::Validation(
            "rules must allow at least one type or name keyword".to_string(),
        ));
    }

    check_disjoint(
        "allowed_types",
        &config.allowed_types,
        "excluded_types",
        &config.excluded_types,
        str::to_ascii_uppercase,
    )?;
    check_disjoint(
        "allowed_name_keywords",
        &config.allowed_name_keywords,
        "excluded_name_keywords",
        &config.excluded_name_keywords,
        str::to_ascii_lowercase,
    )?;

    let blank = config
        .allowed_types
        .iter()
        .chain(&config.excluded_types)
        .chain(&config.allowed_name_keywords)
        .chain(&config.excluded_name_keywords)
        .any(|entry| entry.trim().is_empty());
    if blank {
        return Err(ConfigError::Validation(
            "rule entries cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn check_disjoint(
    left_name: &str,
    left: &[String],
    right_name: &str,
    right: &[String],
    fold: fn(&str) -> String,
) -> Result<(), ConfigError> {
    let left: HashSet<String> = left.iter().map(|s| fold(s.trim())).collect();
    if let Some(shared) = right.iter().map(|s| fold(s.trim())).find(|s| left.contains(s)) {
        return Err(ConfigError::Validation(format!(
            "'{}' appears in both {} and {}",
            shared, left_name, right_name
        )));
    }
    Ok(())
}

/// Validates query plan configuration
fn validate_queries(config: &QueryConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("letters", config.letters),
        ("bigram_first", config.bigram_first),
        ("bigram_second", config.bigram_second),
    ] {
        if value > 26 {
            return Err(ConfigError::Validation(format!(
                "{} must be at most 26, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates the per-country keyword table
fn validate_countries(entries: &[CountryEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for entry in entries {
        validate_country_code(&entry.code)?;
        if !seen.insert(entry.code.as_str()) {
            return Err(ConfigError::Validation(format!(
                "country '{}' is configured more than once",
                entry.code
            )));
        }
    }
    Ok(())
}

/// Validates an ISO 3166-1 alpha-2 code (two ASCII letters)
fn validate_country_code(code: &str) -> Result<(), ConfigError> {
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ConfigError::InvalidCountry(format!(
            "expected two ASCII letters, got '{}'",
            code
        )));
    }
    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
