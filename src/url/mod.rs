//! URL handling module for Netsieve
//!
//! This module provides domain extraction, wildcard domain patterns and the
//! crawl scope that decides which discovered links may be visited.

mod domain;
mod matcher;

use crate::config::CrawlerConfig;
use url::Url;

pub use domain::{extract_domain, parse_http_url};
pub use matcher::DomainPattern;

/// Which domains a crawl may enter
///
/// Exclusions take priority over the allow list. An empty allow list admits
/// every domain that is not excluded.
#[derive(Debug, Clone, Default)]
pub struct LinkScope {
    allowed: Vec<DomainPattern>,
    excluded: Vec<DomainPattern>,
}

impl LinkScope {
    /// A scope that admits every http(s) URL
    pub fn unrestricted() -> Self {
        Self::default()
    }

    pub fn new<A, E>(allowed: A, excluded: E) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(|p| DomainPattern::parse(p.as_ref()))
                .collect(),
            excluded: excluded
                .into_iter()
                .map(|p| DomainPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::new(&config.allowed_domains, &config.excluded_domains)
    }

    /// Returns true if the crawl may visit `url`
    pub fn admits(&self, url: &Url) -> bool {
        let Some(domain) = extract_domain(url) else {
            return false;
        };

        if self.excluded.iter().any(|p| p.matches(&domain)) {
            return false;
        }

        self.allowed.is_empty() || self.allowed.iter().any(|p| p.matches(&domain))
    }
}
