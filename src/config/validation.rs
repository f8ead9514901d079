use crate::config::types::{Config, CrawlerConfig, SitesConfig, StorageConfig, UserAgentConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// One year
const MAX_RECRAWL_WINDOW_HOURS: u64 = 24 * 365;

/// One day
const MAX_RUN_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_storage_config(&config.storage)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if !(1..=10).contains(&config.max_depth) {
        return Err(ConfigError::Validation(format!(
            "max_depth must be between 1 and 10, got {}",
            config.max_depth
        )));
    }

    if config.delay_ms > 10_000 {
        return Err(ConfigError::Validation(format!(
            "delay_ms must be between 0 and 10000, got {}",
            config.delay_ms
        )));
    }

    if !(1..=300).contains(&config.request_timeout_secs) {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.max_redirects > 20 {
        return Err(ConfigError::Validation(format!(
            "max_redirects must be <= 20, got {}",
            config.max_redirects
        )));
    }

    if config.recrawl_window_hours > MAX_RECRAWL_WINDOW_HOURS {
        return Err(ConfigError::Validation(format!(
            "recrawl_window_hours must be between 0 and {}, got {}",
            MAX_RECRAWL_WINDOW_HOURS, config.recrawl_window_hours
        )));
    }

    if !(1..=MAX_RUN_TIMEOUT_SECS).contains(&config.run_timeout_secs) {
        return Err(ConfigError::Validation(format!(
            "run_timeout_secs must be between 1 and {}, got {}",
            MAX_RUN_TIMEOUT_SECS, config.run_timeout_secs
        )));
    }

    if !(1..=16).contains(&config.max_concurrent_sites) {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_sites must be between 1 and 16, got {}",
            config.max_concurrent_sites
        )));
    }

    validate_content_selectors(&config.content_selectors)?;

    Ok(())
}

/// Every content selector must be valid CSS
fn validate_content_selectors(selectors: &[String]) -> Result<(), ConfigError> {
    if selectors.is_empty() {
        return Err(ConfigError::Validation(
            "content_selectors cannot be empty".to_string(),
        ));
    }

    for selector in selectors {
        Selector::parse(selector)
            .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))?;
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
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler_version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates seed site URLs
///
/// An empty list is allowed: the crawler then simply has nothing to do and
/// rejects every manual crawl.
fn validate_sites(sites: &SitesConfig) -> Result<(), ConfigError> {
    for seed in &sites.seeds {
        let url = Url::parse(seed)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Seed URL '{}' must use http or https",
                seed
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Seed URL '{}' has no host",
                seed
            )));
        }
    }

    Ok(())
}
