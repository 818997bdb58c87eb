use crate::config::types::{
    Config, CrawlerConfig, ExtractionConfig, MaterializerConfig, OutputConfig, ServerConfig,
    StorageBackend,
};
use crate::ConfigError;
use scraper::Selector;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_browser_timeouts(config)?;
    validate_extraction_config(&config.extraction)?;
    validate_materializer_config(&config.materializer)?;
    validate_output_config(&config.output)?;
    validate_server_config(&config.server)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_http_url("seed-url", &config.seed_url)?;

    if config.navigation_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "crawler.navigation-timeout-ms must be > 0".to_string(),
        ));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "crawler.max-pages must be >= 1 when set".to_string(),
        ));
    }

    for pattern in config
        .allowed_domains
        .iter()
        .chain(config.excluded_domains.iter())
    {
        validate_domain_pattern(pattern)?;
    }

    if config.discovery.enabled {
        validate_selector("discovery.menu-selector", &config.discovery.menu_selector)?;
        validate_selector("discovery.nested-selector", &config.discovery.nested_selector)?;
    }

    Ok(())
}

fn validate_browser_timeouts(config: &Config) -> Result<(), ConfigError> {
    if config.browser.request_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "browser.request-timeout-ms must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates extraction configuration, including every selector
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    validate_selector("item-selector", &config.item_selector)?;
    validate_selector("count-selector", &config.count_selector)?;
    validate_selector("link-selector", &config.link_selector)?;
    validate_selector("name-selector", &config.name_selector)?;
    validate_selector("price-selector", &config.price_selector)?;

    if config.image_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "extraction.image-selectors must contain at least one selector".to_string(),
        ));
    }
    for selector in &config.image_selectors {
        validate_selector("image-selectors", selector)?;
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "extraction.max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.navigation_timeout_ms == 0
        || config.item_wait_timeout_ms == 0
        || config.max_elapsed_ms == 0
    {
        return Err(ConfigError::Validation(
            "extraction timeouts must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Validates materializer configuration
fn validate_materializer_config(config: &MaterializerConfig) -> Result<(), ConfigError> {
    if config.scroll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "materializer.scroll-interval-ms must be > 0".to_string(),
        ));
    }

    if config.scroll_divisor.is_nan() || config.scroll_divisor <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "materializer.scroll-divisor must be > 0, got {}",
            config.scroll_divisor
        )));
    }

    if config.max_step_px.is_nan() || config.max_step_px <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "materializer.max-step-px must be > 0, got {}",
            config.max_step_px
        )));
    }

    if config.scroll_back_px < 0.0 {
        return Err(ConfigError::Validation(
            "materializer.scroll-back-px cannot be negative".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match config.backend {
        StorageBackend::Files => {
            if config.visited_path.is_empty() {
                return Err(ConfigError::Validation(
                    "visited-path cannot be empty".to_string(),
                ));
            }
            if config.exchanges_path.is_empty() {
                return Err(ConfigError::Validation(
                    "exchanges-path cannot be empty".to_string(),
                ));
            }
        }
        StorageBackend::Sqlite => {
            if config.database_path.is_empty() {
                return Err(ConfigError::Validation(
                    "database-path cannot be empty".to_string(),
                ));
            }
        }
    }

    if config.report_path.is_empty() {
        return Err(ConfigError::Validation(
            "report-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_server_config(config: &ServerConfig) -> Result<(), ConfigError> {
    config.bind.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("Invalid server bind '{}': {}", config.bind, e))
    })?;
    Ok(())
}

/// Validates that a string is an absolute http(s) URL
pub(crate) fn validate_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(url)
}

fn validate_selector(field: &'static str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        field,
        selector: selector.to_string(),
    })?;
    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(domain) => validate_domain_string(domain),
        None => validate_domain_string(pattern),
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
