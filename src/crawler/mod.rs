//! Crawler module for link discovery and API capture
//!
//! This module contains the core crawling logic, including:
//! - Outbound link extraction from rendered pages
//! - Optional hover-driven discovery of menu links
//! - Depth-first and breadth-first traversal over a shared page
//! - Session setup and teardown around a crawl

mod discovery;
mod links;
mod traversal;

pub use discovery::MenuDiscovery;
pub use links::extract_links;
pub use traversal::Crawler;

use crate::browser::{BrowserLauncher, BrowserSession};
use crate::capture::Interceptor;
use crate::config::Config;
use crate::storage::{SharedExchangeLog, SharedVisitedStore};
use crate::Result;
use tokio_util::sync::CancellationToken;

/// What a finished crawl reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Exchanges captured under the seed
    pub captured: usize,
    /// Pages navigated to during this run
    pub pages_visited: u32,
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Launch a browser session and open one page
/// 2. Attach an interceptor feeding `exchanges`
/// 3. Traverse from `seed`, deduplicating through `visited`
/// 4. Close the session, whether or not the traversal succeeded
pub async fn run_crawl(
    config: &Config,
    launcher: &dyn BrowserLauncher,
    visited: SharedVisitedStore,
    exchanges: SharedExchangeLog,
    seed: &str,
    cancel: CancellationToken,
) -> Result<CrawlSummary> {
    tracing::info!("Launching browser...");
    let mut session = launcher.launch().await?;

    let outcome = crawl_in_session(
        session.as_mut(),
        config,
        visited,
        Interceptor::new(exchanges),
        seed,
        cancel,
    )
    .await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }

    outcome
}

async fn crawl_in_session(
    session: &mut dyn BrowserSession,
    config: &Config,
    visited: SharedVisitedStore,
    interceptor: Interceptor,
    seed: &str,
    cancel: CancellationToken,
) -> Result<CrawlSummary> {
    let mut page = session.new_page().await?;
    interceptor.attach(page.as_mut()).await?;

    let mut crawler =
        Crawler::new(&config.crawler, visited, interceptor).with_cancellation(cancel);

    tracing::info!("Starting the crawl process at {}", seed);
    let captured = crawler.crawl(page.as_mut(), seed).await;

    if let Err(e) = page.close().await {
        tracing::debug!("Failed to close page: {}", e);
    }

    let summary = CrawlSummary {
        captured: captured?,
        pages_visited: crawler.pages_visited(),
    };
    tracing::info!(
        "Crawling and API capture complete: {} pages, {} APIs",
        summary.pages_visited,
        summary.captured
    );
    Ok(summary)
}
