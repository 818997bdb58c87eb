use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use netsieve::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Digikala.com/search/").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.digikala.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(str::to_ascii_lowercase)
}

/// Parses an absolute http(s) URL with a host
pub fn parse_http_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(UrlError::InvalidScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_ignores_port_and_path() {
        let url = Url::parse("http://127.0.0.1:8080/a?b=c#d").unwrap();
        assert_eq!(extract_domain(&url), Some("127.0.0.1".to_string()));
    }

    #[test]
    fn test_extract_lowercases() {
        let url = Url::parse("https://API.Example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("api.example.com".to_string()));
    }

    #[test]
    fn test_parse_http_url_accepts_http_and_https() {
        assert!(parse_http_url("https://example.com/").is_ok());
        assert!(parse_http_url(" http://example.com/list ").is_ok());
    }

    #[test]
    fn test_parse_http_url_rejects_other_schemes() {
        assert!(matches!(
            parse_http_url("mailto:someone@example.com"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            parse_http_url("javascript:void(0)"),
            Err(UrlError::InvalidScheme(_))
        ));
    }

    #[test]
    fn test_parse_http_url_rejects_garbage() {
        assert!(matches!(parse_http_url("/relative"), Err(UrlError::Parse(_))));
    }
}
