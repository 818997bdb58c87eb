use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use netsieve::config::load_config;
///
/// let config = load_config(Path::new("netsieve.toml")).unwrap();
/// println!("Seed: {}", config.crawler.seed_url);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so captured artifacts can be tied back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        BrowserEngine, ExchangeFormat, RecoveryAction, StorageBackend, TraversalOrder,
        WaitCondition,
    };
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[crawler]
seed-url = "https://shop.example.com/"
traversal = "breadth-first"
wait-condition = "load"
navigation-timeout-ms = 30000
max-pages = 250
allowed-domains = ["*.example.com"]

[crawler.discovery]
enabled = true
hover-pause-ms = 250

[browser]
engine = "http"
user-agent = "netsieve-test/1.0"

[extraction]
max-attempts = 3
recovery = "forward"

[output]
backend = "sqlite"
database-path = "./capture.db"
exchanges-format = "csv"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.seed_url, "https://shop.example.com/");
        assert_eq!(config.crawler.traversal, TraversalOrder::BreadthFirst);
        assert_eq!(config.crawler.wait_condition, WaitCondition::Load);
        assert_eq!(config.crawler.max_pages, Some(250));
        assert!(config.crawler.discovery.enabled);
        assert_eq!(config.crawler.discovery.hover_pause_ms, 250);
        assert_eq!(config.crawler.discovery.nested_selector, "ul, .submenu");
        assert_eq!(config.browser.engine, BrowserEngine::Http);
        assert_eq!(config.extraction.max_attempts, 3);
        assert_eq!(config.extraction.recovery, RecoveryAction::Forward);
        assert_eq!(config.output.backend, StorageBackend::Sqlite);
        assert_eq!(config.output.exchanges_format, ExchangeFormat::Csv);

        // Untouched sections keep their defaults
        assert_eq!(config.materializer.settle_ms, 5_000);
        assert_eq!(config.server.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.crawler.navigation_timeout_ms, 60_000);
        assert_eq!(config.extraction.item_wait_timeout_ms, 10_000);
        assert_eq!(config.output.visited_path, "crawled_urls.json");
        assert!(!config.crawler.discovery.enabled);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/netsieve.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_enum_value_is_parse_error() {
        let result = parse_config("[crawler]\ntraversal = \"sideways\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[materializer]
scroll-interval-ms = 0
"#;
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
