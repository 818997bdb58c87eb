//! Network exchange capture
//!
//! Decides which responses observed while a page renders are backend data
//! endpoints, and records them through an append-only [`ExchangeLog`].
//!
//! [`ExchangeLog`]: crate::storage::ExchangeLog

mod interceptor;

pub use interceptor::Interceptor;

use crate::browser::ObservedResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type marker for capturable responses
const JSON_CONTENT_TYPE: &str = "application/json";

/// A JSON endpoint observed while a page was loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedExchange {
    /// URL of the response
    pub request_url: String,

    /// `Referer` of the request, i.e. the page that triggered it
    pub origin_page_url: Option<String>,

    pub content_type: String,

    pub observed_at: DateTime<Utc>,
}

impl CapturedExchange {
    /// Builds an exchange from a response that passed [`should_capture`]
    pub fn from_response(response: &ObservedResponse, observed_at: DateTime<Utc>) -> Self {
        Self {
            request_url: response.url.clone(),
            origin_page_url: response.referer.clone().filter(|r| !r.is_empty()),
            content_type: response.content_type.clone().unwrap_or_default(),
            observed_at,
        }
    }

    /// True when no originating page is known
    pub fn is_unassociated(&self) -> bool {
        self.origin_page_url.is_none()
    }
}

/// The capture predicate
///
/// A response is captured when its request method is not `OPTIONS` and its
/// declared content type contains `application/json`. An unknown method is
/// treated as "not a preflight".
pub fn should_capture(method: Option<&str>, content_type: Option<&str>) -> bool {
    if method.is_some_and(|m| m.eq_ignore_ascii_case("OPTIONS")) {
        return false;
    }

    content_type
        .map(|ct| ct.to_ascii_lowercase().contains(JSON_CONTENT_TYPE))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_get_is_captured() {
        assert!(should_capture(
            Some("GET"),
            Some("application/json; charset=utf-8")
        ));
        assert!(should_capture(Some("POST"), Some("Application/JSON")));
        assert!(should_capture(None, Some("application/json")));
    }

    #[test]
    fn test_options_is_never_captured() {
        assert!(!should_capture(Some("OPTIONS"), Some("application/json")));
        assert!(!should_capture(Some("options"), Some("application/json")));
    }

    #[test]
    fn test_non_json_is_not_captured() {
        assert!(!should_capture(Some("GET"), Some("text/html; charset=utf-8")));
        assert!(!should_capture(Some("GET"), Some("image/webp")));
        assert!(!should_capture(Some("GET"), None));
    }

    #[test]
    fn test_from_response_drops_empty_referer() {
        let response = ObservedResponse {
            url: "https://api.example.com/v1/items".to_string(),
            method: Some("GET".to_string()),
            content_type: Some("application/json".to_string()),
            referer: Some(String::new()),
            status: 200,
        };

        let exchange = CapturedExchange::from_response(&response, Utc::now());
        assert_eq!(exchange.request_url, "https://api.example.com/v1/items");
        assert!(exchange.is_unassociated());
    }

    #[test]
    fn test_json_field_names() {
        let exchange = CapturedExchange {
            request_url: "https://api.example.com/a".to_string(),
            origin_page_url: Some("https://example.com/".to_string()),
            content_type: "application/json".to_string(),
            observed_at: Utc::now(),
        };

        let value = serde_json::to_value(&exchange).unwrap();
        assert_eq!(value["requestUrl"], "https://api.example.com/a");
        assert_eq!(value["originPageUrl"], "https://example.com/");
        assert!(value.get("observedAt").is_some());
    }
}
