use std::fmt;

/// A domain pattern from the crawl scope configuration
///
/// Two forms are supported:
/// 1. Exact: `example.com` matches only `example.com`
/// 2. Subtree: `*.example.com` matches `example.com` itself and any
///    subdomain at any depth (`blog.example.com`, `api.v2.example.com`)
///
/// Matching ignores ASCII case on both sides.
///
/// # Examples
///
/// ```
/// use netsieve::url::DomainPattern;
///
/// let pattern = DomainPattern::parse("*.example.com");
/// assert!(pattern.matches("example.com"));
/// assert!(pattern.matches("Shop.Example.com"));
/// assert!(!pattern.matches("myexample.com"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPattern {
    Exact(String),
    Subtree(String),
}

impl DomainPattern {
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        match pattern.strip_prefix("*.") {
            Some(base) => Self::Subtree(base.to_string()),
            None => Self::Exact(pattern),
        }
    }

    /// Returns true if `domain` falls under this pattern
    pub fn matches(&self, domain: &str) -> bool {
        let domain = domain.to_ascii_lowercase();
        match self {
            Self::Exact(expected) => domain == *expected,
            Self::Subtree(base) => {
                domain == *base
                    || (domain.len() > base.len()
                        && domain.ends_with(base.as_str())
                        && domain.as_bytes()[domain.len() - base.len() - 1] == b'.')
            }
        }
    }
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(domain) => write!(f, "{}", domain),
            Self::Subtree(base) => write!(f, "*.{}", base),
        }
    }
}
