//! Configuration module for Netsieve
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; missing keys fall back to each section's
//! `Default`.
//!
//! # Example
//!
//! ```no_run
//! use netsieve::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("netsieve.toml")).unwrap();
//! println!("Crawl starts at: {}", config.crawler.seed_url);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    BrowserConfig, BrowserEngine, Config, CrawlerConfig, DiscoveryConfig, ExchangeFormat,
    ExtractionConfig,
    MaterializerConfig, OutputConfig, RecoveryAction, ServerConfig, StorageBackend,
    TraversalOrder, WaitCondition,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
