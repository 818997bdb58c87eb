//! HTTP-only page driver
//!
//! Renders nothing and runs no scripts: a navigation is a single GET whose
//! body becomes the page content. Useful for static sites and for exercising
//! the crawler against mock servers.
//!
//! Each navigation is reported to the registered response handlers exactly
//! like a browser would report the document response, including the
//! `Referer` header derived from the previously loaded page.

use super::{
    BrowserError, BrowserLauncher, BrowserResult, BrowserSession, ObservedResponse, PageDriver,
    ResponseHandler,
};
use crate::config::{BrowserConfig, WaitCondition};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;

/// Default user agent when `[browser] user-agent` is not set
pub fn default_user_agent() -> String {
    format!("netsieve/{}", env!("CARGO_PKG_VERSION"))
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use netsieve::config::BrowserConfig;
/// use netsieve::browser::http::build_http_client;
///
/// let client = build_http_client(&BrowserConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &BrowserConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config
        .user_agent
        .clone()
        .unwrap_or_else(default_user_agent);

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Launches [`HttpSession`]s
pub struct HttpLauncher {
    config: BrowserConfig,
}

impl HttpLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BrowserLauncher for HttpLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let client = build_http_client(&self.config)
            .map_err(|e| BrowserError::Launch(format!("failed to build HTTP client: {}", e)))?;
        Ok(Box::new(HttpSession { client }))
    }
}

/// A "browser" that is just a shared HTTP client
pub struct HttpSession {
    client: Client,
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn PageDriver>> {
        Ok(Box::new(HttpPage::new(self.client.clone())))
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        Ok(())
    }
}

/// A page backed by the last fetched response body
pub struct HttpPage {
    client: Client,
    current_url: Option<String>,
    body: String,
    handlers: Vec<ResponseHandler>,
}

impl HttpPage {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            current_url: None,
            body: String::new(),
            handlers: Vec::new(),
        }
    }

    fn notify(&self, response: &ObservedResponse) {
        for handler in &self.handlers {
            handler(Ok(response.clone()));
        }
    }

    fn notify_failure(&self, error: &BrowserError) {
        for handler in &self.handlers {
            handler(Err(BrowserError::Protocol(error.to_string())));
        }
    }

    async fn fetch(&self, url: &str) -> BrowserResult<(ObservedResponse, String)> {
        let referer = self.current_url.clone();

        let mut request = self.client.get(url);
        if let Some(referer) = &referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let observed = ObservedResponse {
            url: final_url,
            method: Some("GET".to_string()),
            content_type,
            referer,
            status,
        };

        let body = response.text().await?;
        Ok((observed, body))
    }
}

#[async_trait]
impl PageDriver for HttpPage {
    async fn goto(
        &mut self,
        url: &str,
        _wait: WaitCondition,
        timeout: Duration,
    ) -> BrowserResult<()> {
        let result = tokio::time::timeout(timeout, self.fetch(url))
            .await
            .map_err(|_| BrowserError::Timeout {
                operation: format!("navigation to {}", url),
                timeout_ms: timeout.as_millis() as u64,
            })?;

        let (observed, body) = match result {
            Ok(fetched) => fetched,
            Err(e) => {
                self.notify_failure(&e);
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: e.to_string(),
                })
            }
        };

        self.notify(&observed);

        if observed.status >= 400 {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: format!("HTTP {}", observed.status),
            });
        }

        self.current_url = Some(observed.url);
        self.body = body;
        Ok(())
    }

    async fn evaluate(&mut self, _script: &str) -> BrowserResult<serde_json::Value> {
        Err(BrowserError::Unsupported(
            "script evaluation in the HTTP driver",
        ))
    }

    async fn on_response(&mut self, handler: ResponseHandler) -> BrowserResult<()> {
        self.handlers.push(handler);
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        // The document never changes after load, so one check is final
        if document_has(&self.body, selector)? {
            Ok(())
        } else {
            Err(BrowserError::Timeout {
                operation: format!("waiting for '{}'", selector),
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn wait_for_timeout(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn content(&mut self) -> BrowserResult<String> {
        Ok(self.body.clone())
    }

    async fn current_url(&mut self) -> BrowserResult<Option<String>> {
        Ok(self.current_url.clone())
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        Ok(())
    }
}

fn document_has(body: &str, selector: &str) -> BrowserResult<bool> {
    let selector = Selector::parse(selector)
        .map_err(|_| BrowserError::Script(format!("invalid selector '{}'", selector)))?;
    let document = Html::parse_document(body);
    let found = document.select(&selector).next().is_some();
    Ok(found)
}
