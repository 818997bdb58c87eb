use super::{should_capture, CapturedExchange};
use crate::browser::{BrowserResult, ObservedResponse, PageDriver, ResponseHandler};
use crate::storage::SharedExchangeLog;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Passive observer of a page's responses
///
/// Attached once per page; every response is run through the capture
/// predicate and matches are appended to the exchange log immediately.
/// Failures are logged per exchange and never reach the navigation.
///
/// Cloning yields a handle to the same log and counter.
#[derive(Clone)]
pub struct Interceptor {
    log: SharedExchangeLog,
    captured: Arc<AtomicUsize>,
}

impl Interceptor {
    pub fn new(log: SharedExchangeLog) -> Self {
        Self {
            log,
            captured: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of exchanges recorded since this interceptor was created
    ///
    /// The crawler reads this before and after each navigation to attribute
    /// exchanges to the page being loaded.
    pub fn captured(&self) -> usize {
        self.captured.load(Ordering::SeqCst)
    }

    /// Subscribes to every response `page` receives from now on
    pub async fn attach(&self, page: &mut dyn PageDriver) -> BrowserResult<()> {
        page.on_response(self.handler()).await
    }

    /// The callback handed to the page driver
    pub fn handler(&self) -> ResponseHandler {
        let interceptor = self.clone();
        Arc::new(move |response| interceptor.observe(response))
    }

    /// Classifies one response and records it when it matches
    pub fn observe(&self, response: BrowserResult<ObservedResponse>) {
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Error processing response: {}", e);
                return;
            }
        };

        if !should_capture(response.method.as_deref(), response.content_type.as_deref()) {
            return;
        }

        let exchange = CapturedExchange::from_response(&response, Utc::now());

        let appended = match self.log.lock() {
            Ok(mut log) => log.append(&exchange),
            Err(_) => {
                tracing::warn!(
                    "Exchange log lock poisoned, dropping {}",
                    exchange.request_url
                );
                return;
            }
        };

        match appended {
            Ok(()) => {
                self.captured.fetch_add(1, Ordering::SeqCst);
                tracing::info!("API found: {}", exchange.request_url);
            }
            Err(e) => {
                tracing::warn!("Failed to record {}: {}", exchange.request_url, e);
            }
        }
    }
}
