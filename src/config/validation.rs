use crate::config::types::{
    Config, CrawlerConfig, MarketplacesConfig, OutputConfig, RetryConfig, TrackerConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_tracker_config(&config.tracker)?;
    validate_retry_config(&config.retry)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_marketplaces(&config.marketplaces)?;

    if config.http.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates what to track
fn validate_tracker_config(config: &TrackerConfig) -> Result<(), ConfigError> {
    if config.cities.is_empty() {
        return Err(ConfigError::Validation(
            "at least one city must be configured".to_string(),
        ));
    }

    for city in &config.cities {
        validate_city_slug(city)?;
    }

    if config.offers.is_empty() {
        return Err(ConfigError::Validation(
            "offers cannot be empty".to_string(),
        ));
    }

    if config.estates.is_empty() {
        return Err(ConfigError::Validation(
            "estates cannot be empty".to_string(),
        ));
    }

    if config.interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "interval_secs must be >= 1, got {}",
            config.interval_secs
        )));
    }

    if config.max_concurrent_targets < 1 || config.max_concurrent_targets > 32 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_targets must be between 1 and 32, got {}",
            config.max_concurrent_targets
        )));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.backoff_base_ms > config.backoff_cap_ms {
        return Err(ConfigError::Validation(format!(
            "backoff_base_ms ({}) cannot exceed backoff_cap_ms ({})",
            config.backoff_base_ms, config.backoff_cap_ms
        )));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "page_limit must be >= 1, got {}",
            config.page_limit
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates marketplace overrides
fn validate_marketplaces(config: &MarketplacesConfig) -> Result<(), ConfigError> {
    if !config.otodom.enabled && !config.olx.common.enabled {
        return Err(ConfigError::Validation(
            "at least one marketplace must be enabled".to_string(),
        ));
    }

    for base_url in [&config.otodom.base_url, &config.olx.common.base_url]
        .into_iter()
        .flatten()
    {
        validate_base_url(base_url)?;
    }

    for selector in [&config.olx.count_selector, &config.olx.listing_selector]
        .into_iter()
        .flatten()
    {
        if selector.trim().is_empty() {
            return Err(ConfigError::Validation(
                "OLX selectors cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a city slug: lowercase ASCII letters, digits and hyphens
fn validate_city_slug(city: &str) -> Result<(), ConfigError> {
    if city.is_empty() {
        return Err(ConfigError::Validation(
            "city cannot be empty".to_string(),
        ));
    }

    if !city
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "city '{}' must contain only lowercase letters, digits and hyphens",
            city
        )));
    }

    if city.starts_with('-') || city.ends_with('-') {
        return Err(ConfigError::Validation(format!(
            "city '{}' cannot start or end with '-'",
            city
        )));
    }

    Ok(())
}

fn validate_base_url(base_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            base_url
        )));
    }

    Ok(())
}
