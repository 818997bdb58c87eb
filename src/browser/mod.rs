//! Browser driver abstraction
//!
//! The crawler, materializer and validator only talk to pages through the
//! traits in this module. Two drivers are provided:
//!
//! - [`chromium`]: headless Chromium over the DevTools protocol
//! - [`http`]: plain HTTP fetches with no script execution
//!
//! A session owns one browser; a page is a single tab. No two operations
//! run concurrently against the same page, so every page method takes
//! `&mut self`.

pub mod chromium;
pub mod http;

use crate::config::{BrowserEngine, Config, WaitCondition};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use chromium::ChromiumLauncher;
pub use http::HttpLauncher;

/// Errors raised by browser drivers
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: String,
        timeout_ms: u64,
    },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Operation not supported by this driver: {0}")]
    Unsupported(&'static str),

    #[error("Browser protocol error: {0}")]
    Protocol(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for browser operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// A response seen by a page while it was loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedResponse {
    /// Final URL of the response
    pub url: String,

    /// Request method, when the driver could correlate it
    pub method: Option<String>,

    /// Declared `Content-Type` (or MIME type reported by the browser)
    pub content_type: Option<String>,

    /// `Referer` request header, absent when the request carried none
    pub referer: Option<String>,

    pub status: u16,
}

/// Callback invoked for every response a page receives
///
/// Drivers report failures to read a response as `Err` so the observer can
/// log them without the navigation being affected.
pub type ResponseHandler = Arc<dyn Fn(BrowserResult<ObservedResponse>) + Send + Sync>;

/// Starts browsing sessions
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>>;
}

/// A running browser
#[async_trait]
pub trait BrowserSession: Send {
    /// Opens a new blank page
    async fn new_page(&mut self) -> BrowserResult<Box<dyn PageDriver>>;

    /// Shuts the browser down, closing every page it owns
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}

/// A single page (tab)
#[async_trait]
pub trait PageDriver: Send {
    /// Navigates to `url`, returning once `wait` is satisfied
    ///
    /// Bounded by `timeout`; exceeding it yields [`BrowserError::Timeout`].
    async fn goto(&mut self, url: &str, wait: WaitCondition, timeout: Duration)
        -> BrowserResult<()>;

    /// Evaluates a script expression in the page and returns its JSON value
    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Registers a handler for every response received from now on
    async fn on_response(&mut self, handler: ResponseHandler) -> BrowserResult<()>;

    /// Waits until an element matching `selector` exists
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()>;

    async fn wait_for_timeout(&mut self, duration: Duration);

    /// Serialized DOM of the current document
    async fn content(&mut self) -> BrowserResult<String>;

    /// URL of the current document, `None` before the first navigation
    async fn current_url(&mut self) -> BrowserResult<Option<String>>;

    async fn close(self: Box<Self>) -> BrowserResult<()>;
}

/// Builds the launcher selected by `[browser] engine`
pub fn launcher_for(config: &Config) -> Arc<dyn BrowserLauncher> {
    match config.browser.engine {
        BrowserEngine::Chromium => Arc::new(ChromiumLauncher::new(config.browser.clone())),
        BrowserEngine::Http => Arc::new(HttpLauncher::new(config.browser.clone())),
    }
}

/// Scripted in-memory page used by unit tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use serde_json::Value;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    /// Everything a [`FakePage`] was asked to do
    #[derive(Debug, Default)]
    pub(crate) struct FakeLog {
        pub gotos: Vec<String>,
        pub scripts: Vec<String>,
        pub waits: Vec<Duration>,
        pub selector_waits: Vec<String>,
    }

    #[derive(Default)]
    pub(crate) struct FakePage {
        pages: HashMap<String, String>,
        responses: HashMap<String, Vec<ObservedResponse>>,
        late_responses: HashMap<String, Vec<ObservedResponse>>,
        failing: HashSet<String>,
        evaluations: VecDeque<BrowserResult<Value>>,
        handlers: Vec<ResponseHandler>,
        current: Option<String>,
        pub log: Arc<Mutex<FakeLog>>,
    }

    impl FakePage {
        pub fn new() -> Self {
            Self::default()
        }

        /// Serves `html` when `url` is visited
        pub fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }

        /// Emits `response` to every handler when `url` is visited
        pub fn with_response(mut self, url: &str, response: ObservedResponse) -> Self {
            self.responses
                .entry(url.to_string())
                .or_default()
                .push(response);
            self
        }

        /// Emits `response` once the content of `url` is read, after
        /// navigation has returned
        pub fn with_late_response(mut self, url: &str, response: ObservedResponse) -> Self {
            self.late_responses
                .entry(url.to_string())
                .or_default()
                .push(response);
            self
        }

        fn emit(&self, responses: &HashMap<String, Vec<ObservedResponse>>, url: &str) {
            for response in responses.get(url).into_iter().flatten() {
                for handler in &self.handlers {
                    handler(Ok(response.clone()));
                }
            }
        }

        /// Makes navigation to `url` time out
        pub fn with_failure(mut self, url: &str) -> Self {
            self.failing.insert(url.to_string());
            self
        }

        /// Queues the next value returned by `evaluate`
        pub fn with_evaluation(mut self, value: BrowserResult<Value>) -> Self {
            self.evaluations.push_back(value);
            self
        }

        pub fn log(&self) -> Arc<Mutex<FakeLog>> {
            Arc::clone(&self.log)
        }
    }

    /// A JSON response as the interceptor would see it
    pub(crate) fn json_response(url: &str, referer: Option<&str>) -> ObservedResponse {
        ObservedResponse {
            url: url.to_string(),
            method: Some("GET".to_string()),
            content_type: Some("application/json; charset=utf-8".to_string()),
            referer: referer.map(str::to_string),
            status: 200,
        }
    }

    #[async_trait]
    impl PageDriver for FakePage {
        async fn goto(
            &mut self,
            url: &str,
            _wait: WaitCondition,
            timeout: Duration,
        ) -> BrowserResult<()> {
            self.log.lock().unwrap().gotos.push(url.to_string());

            if self.failing.contains(url) {
                return Err(BrowserError::Timeout {
                    operation: format!("navigation to {}", url),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }

            self.current = Some(url.to_string());
            self.emit(&self.responses, url);
            Ok(())
        }

        async fn evaluate(&mut self, script: &str) -> BrowserResult<Value> {
            self.log.lock().unwrap().scripts.push(script.to_string());
            self.evaluations.pop_front().unwrap_or(Ok(Value::Null))
        }

        async fn on_response(&mut self, handler: ResponseHandler) -> BrowserResult<()> {
            self.handlers.push(handler);
            Ok(())
        }

        async fn wait_for_selector(
            &mut self,
            selector: &str,
            _timeout: Duration,
        ) -> BrowserResult<()> {
            self.log
                .lock()
                .unwrap()
                .selector_waits
                .push(selector.to_string());
            Ok(())
        }

        async fn wait_for_timeout(&mut self, duration: Duration) {
            self.log.lock().unwrap().waits.push(duration);
        }

        async fn content(&mut self) -> BrowserResult<String> {
            if let Some(url) = &self.current {
                self.emit(&self.late_responses, url);
            }
            Ok(self
                .current
                .as_ref()
                .and_then(|url| self.pages.get(url))
                .cloned()
                .unwrap_or_else(|| "<html><body></body></html>".to_string()))
        }

        async fn current_url(&mut self) -> BrowserResult<Option<String>> {
            Ok(self.current.clone())
        }

        async fn close(self: Box<Self>) -> BrowserResult<()> {
            Ok(())
        }
    }
}
