//! Chromium page driver using chromiumoxide
//!
//! Responses are observed through the DevTools `Network` domain. Each page
//! runs one monitor task that correlates request, response and completion
//! events by request id. It recovers the method and `Referer` header for
//! every response and tracks how many requests are still in flight, which
//! is what [`WaitCondition::NetworkIdle`] waits on.

use super::{
    BrowserError, BrowserLauncher, BrowserResult, BrowserSession, ObservedResponse, PageDriver,
    ResponseHandler,
};
use crate::config::{BrowserConfig, WaitCondition};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
    EventResponseReceived,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const SELECTOR_POLL: Duration = Duration::from_millis(100);

/// Launches headless (or headed) Chromium
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    fn cdp_config(&self) -> BrowserResult<CdpConfig> {
        let mut builder = CdpConfig::builder()
            .request_timeout(Duration::from_millis(self.config.request_timeout_ms))
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(agent) = &self.config.user_agent {
            builder = builder.arg(format!("--user-agent={}", agent));
        }

        builder
            .build()
            .map_err(|e| BrowserError::Launch(format!("invalid browser config: {}", e)))
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> BrowserResult<Box<dyn BrowserSession>> {
        let (browser, mut handler) = Browser::launch(self.cdp_config()?)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The handler must be polled for the browser to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::debug!("Browser handler event error: {:?}", event);
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            network_idle: Duration::from_millis(self.config.network_idle_ms),
        }))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    network_idle: Duration,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&mut self) -> BrowserResult<Box<dyn PageDriver>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(protocol_error)?;

        page.execute(EnableParams::default())
            .await
            .map_err(protocol_error)?;

        let monitor = NetworkMonitor::spawn(&page).await?;

        Ok(Box::new(ChromiumPage {
            page,
            network_idle: self.network_idle,
            monitor,
        }))
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let mut session = *self;
        let closed = session.browser.close().await.map_err(protocol_error);
        let _ = session.browser.wait().await;
        session.handler_task.abort();
        closed.map(|_| ())
    }
}

/// A request seen by the monitor that has not finished loading
#[derive(Debug, Clone, PartialEq)]
struct PendingRequest {
    url: String,
    method: String,
    referer: Option<String>,
    responded: bool,
}

/// Request bookkeeping keyed by DevTools request id
///
/// An entry lives from `requestWillBeSent` until `loadingFinished` or
/// `loadingFailed`, so the number of entries is the number of requests in
/// flight.
#[derive(Debug, Default)]
struct NetworkLedger {
    pending: HashMap<String, PendingRequest>,
}

impl NetworkLedger {
    fn request_sent(&mut self, id: &str, url: &str, method: &str, referer: Option<String>) {
        // Redirects reuse the id; the latest hop wins
        self.pending.insert(
            id.to_string(),
            PendingRequest {
                url: url.to_string(),
                method: method.to_string(),
                referer,
                responded: false,
            },
        );
    }

    /// Marks a response as received, returning its method and referer
    fn response_received(&mut self, id: &str) -> (Option<String>, Option<String>) {
        match self.pending.get_mut(id) {
            Some(request) => {
                request.responded = true;
                (Some(request.method.clone()), request.referer.clone())
            }
            None => (None, None),
        }
    }

    fn finished(&mut self, id: &str) {
        self.pending.remove(id);
    }

    fn failed(&mut self, id: &str) -> Option<PendingRequest> {
        self.pending.remove(id)
    }

    fn in_flight(&self) -> usize {
        self.pending.len()
    }
}

/// Handle to a page's network monitor task
struct NetworkMonitor {
    task: JoinHandle<()>,
    handlers: mpsc::UnboundedSender<ResponseHandler>,
    in_flight: watch::Receiver<usize>,
}

impl NetworkMonitor {
    async fn spawn(page: &Page) -> BrowserResult<Self> {
        let mut requests = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(protocol_error)?;
        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(protocol_error)?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(protocol_error)?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(protocol_error)?;

        let (handler_tx, mut handler_rx) = mpsc::unbounded_channel::<ResponseHandler>();
        let (in_flight_tx, in_flight_rx) = watch::channel(0usize);

        let task = tokio::spawn(async move {
            let mut ledger = NetworkLedger::default();
            let mut handlers: Vec<ResponseHandler> = Vec::new();

            loop {
                tokio::select! {
                    biased;
                    Some(handler) = handler_rx.recv() => handlers.push(handler),
                    Some(event) = requests.next() => {
                        ledger.request_sent(
                            event.request_id.inner(),
                            &event.request.url,
                            &event.request.method,
                            header_value(&event.request.headers, "referer"),
                        );
                    }
                    Some(event) = responses.next() => {
                        let (method, referer) = ledger.response_received(event.request_id.inner());

                        let content_type = header_value(&event.response.headers, "content-type")
                            .or_else(|| Some(event.response.mime_type.clone()))
                            .filter(|value| !value.is_empty());

                        let observed = ObservedResponse {
                            url: event.response.url.clone(),
                            method,
                            content_type,
                            referer,
                            status: u16::try_from(event.response.status).unwrap_or(0),
                        };
                        for handler in &handlers {
                            handler(Ok(observed.clone()));
                        }
                    }
                    Some(event) = finished.next() => ledger.finished(event.request_id.inner()),
                    Some(event) = failed.next() => {
                        match ledger.failed(event.request_id.inner()) {
                            Some(request) if request.responded => {
                                let message = format!("reading {} failed: {}", request.url, event.error_text);
                                for handler in &handlers {
                                    handler(Err(BrowserError::Protocol(message.clone())));
                                }
                            }
                            Some(request) => {
                                tracing::debug!("Request to {} failed: {}", request.url, event.error_text);
                            }
                            None => {}
                        }
                    }
                    else => break,
                }

                let now = ledger.in_flight();
                in_flight_tx.send_if_modified(|count| {
                    let changed = *count != now;
                    *count = now;
                    changed
                });
            }
        });

        Ok(Self {
            task,
            handlers: handler_tx,
            in_flight: in_flight_rx,
        })
    }
}

/// Returns once no request has been in flight for `quiet`
///
/// Also returns if the monitor stops. Callers bound the wait with their own
/// timeout.
async fn wait_for_network_idle(in_flight: &mut watch::Receiver<usize>, quiet: Duration) {
    loop {
        if *in_flight.borrow_and_update() == 0 {
            match tokio::time::timeout(quiet, in_flight.changed()).await {
                Err(_) => return,
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return,
            }
        } else if in_flight.changed().await.is_err() {
            return;
        }
    }
}

pub struct ChromiumPage {
    page: Page,
    network_idle: Duration,
    monitor: NetworkMonitor,
}

impl ChromiumPage {
    async fn navigate(&self, url: &str, wait: WaitCondition) -> BrowserResult<()> {
        let navigation_error = |e: chromiumoxide::error::CdpError| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        self.page.goto(url).await.map_err(navigation_error)?;

        match wait {
            WaitCondition::DomContentLoaded => {}
            WaitCondition::Load => {
                self.page
                    .wait_for_navigation()
                    .await
                    .map_err(navigation_error)?;
            }
            WaitCondition::NetworkIdle => {
                self.page
                    .wait_for_navigation()
                    .await
                    .map_err(navigation_error)?;
                let mut in_flight = self.monitor.in_flight.clone();
                wait_for_network_idle(&mut in_flight, self.network_idle).await;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromiumPage {
    async fn goto(
        &mut self,
        url: &str,
        wait: WaitCondition,
        timeout: Duration,
    ) -> BrowserResult<()> {
        tokio::time::timeout(timeout, self.navigate(url, wait))
            .await
            .map_err(|_| BrowserError::Timeout {
                operation: format!("navigation to {}", url),
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn on_response(&mut self, handler: ResponseHandler) -> BrowserResult<()> {
        self.monitor
            .handlers
            .send(handler)
            .map_err(|_| BrowserError::Protocol("network monitor has stopped".to_string()))
    }

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> BrowserResult<()> {
        let page = &self.page;
        let poll = async {
            loop {
                if page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(SELECTOR_POLL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| BrowserError::Timeout {
                operation: format!("waiting for '{}'", selector),
                timeout_ms: timeout.as_millis() as u64,
            })
    }

    async fn wait_for_timeout(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn content(&mut self) -> BrowserResult<String> {
        self.page.content().await.map_err(protocol_error)
    }

    async fn current_url(&mut self) -> BrowserResult<Option<String>> {
        self.page.url().await.map_err(protocol_error)
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let page = *self;
        page.monitor.task.abort();
        page.page.close().await.map_err(protocol_error)
    }
}

fn protocol_error(error: chromiumoxide::error::CdpError) -> BrowserError {
    BrowserError::Protocol(error.to_string())
}

/// Case-insensitive lookup in a DevTools header map
fn header_value<H: serde::Serialize>(headers: &H, name: &str) -> Option<String> {
    let value = serde_json::to_value(headers).ok()?;
    value
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .and_then(|(_, value)| value.as_str())
        .map(str::to_string)
}
