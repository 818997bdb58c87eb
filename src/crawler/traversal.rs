//! Link-graph traversal
//!
//! Visits pages on a single shared browser page, claiming each URL in the
//! visited store before navigating to it. The interceptor observes every
//! navigation; the number of exchanges it records from the start of a
//! page's navigation until its links have been collected is that page's
//! own contribution to the count.

use crate::browser::PageDriver;
use crate::capture::Interceptor;
use crate::config::{CrawlerConfig, TraversalOrder, WaitCondition};
use crate::crawler::discovery::MenuDiscovery;
use crate::crawler::links::extract_links;
use crate::storage::{SharedVisitedStore, StorageError};
use crate::url::{parse_http_url, LinkScope};
use crate::{Result, SieveError};
use futures::future::BoxFuture;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Outcome of claiming a URL before visiting it
enum Claim {
    /// Newly claimed and persisted
    Owned,
    /// Newly claimed but the store could not persist it
    Volatile(StorageError),
    /// Someone already visited it
    Taken,
}

/// Crawls a site by following anchors
pub struct Crawler {
    visited: SharedVisitedStore,
    interceptor: Interceptor,
    scope: LinkScope,
    traversal: TraversalOrder,
    wait: WaitCondition,
    navigation_timeout: Duration,
    max_pages: Option<u32>,
    discovery: Option<MenuDiscovery>,
    pages_visited: u32,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(config: &CrawlerConfig, visited: SharedVisitedStore, interceptor: Interceptor) -> Self {
        Self {
            visited,
            interceptor,
            scope: LinkScope::from_config(config),
            traversal: config.traversal,
            wait: config.wait_condition,
            navigation_timeout: Duration::from_millis(config.navigation_timeout_ms),
            max_pages: config.max_pages,
            discovery: config
                .discovery
                .enabled
                .then(|| MenuDiscovery::new(config.discovery.clone())),
            pages_visited: 0,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops the crawl with [`SieveError::Cancelled`] once `token` fires
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Pages navigated to by this crawler so far
    pub fn pages_visited(&self) -> u32 {
        self.pages_visited
    }

    /// Crawls from `seed`, returning the number of exchanges captured
    ///
    /// In depth-first order the count is the sum over the seed's subtree;
    /// in breadth-first order it is the total for the run. Either way a seed
    /// that was already visited yields 0 without navigating.
    pub async fn crawl(&mut self, page: &mut dyn PageDriver, seed: &str) -> Result<usize> {
        parse_http_url(seed)?;

        match self.traversal {
            TraversalOrder::DepthFirst => self.crawl_depth_first(page, seed.to_string()).await,
            TraversalOrder::BreadthFirst => self.crawl_breadth_first(page, seed.to_string()).await,
        }
    }

    fn crawl_depth_first<'a>(
        &'a mut self,
        page: &'a mut dyn PageDriver,
        url: String,
    ) -> BoxFuture<'a, Result<usize>> {
        Box::pin(async move {
            let Some((own, links)) = self.visit(page, &url).await? else {
                return Ok(0);
            };

            let mut total = own;
            for link in links {
                if self.budget_exhausted() {
                    break;
                }
                tracing::debug!("Crawling and searching for APIs in: {}", link);
                total += self.crawl_depth_first(&mut *page, link).await?;
            }

            tracing::info!("API Found: > {} APIs in {}", total, url);
            Ok(total)
        })
    }

    async fn crawl_breadth_first(&mut self, page: &mut dyn PageDriver, seed: String) -> Result<usize> {
        let mut queue = VecDeque::from([seed]);
        let mut total = 0;

        while let Some(url) = queue.pop_front() {
            if self.budget_exhausted() {
                tracing::info!("Page budget reached, {} URLs left in queue", queue.len() + 1);
                break;
            }

            if let Some((own, links)) = self.visit(page, &url).await? {
                total += own;
                queue.extend(links);
            }
        }

        tracing::info!("API Found: > {} APIs in this run", total);
        Ok(total)
    }

    /// Visits one URL
    ///
    /// Returns `None` when the URL is skipped (already visited, out of
    /// scope or over budget). Otherwise returns the exchanges captured while
    /// it was loaded and read, and its unvisited in-scope links.
    async fn visit(
        &mut self,
        page: &mut dyn PageDriver,
        url: &str,
    ) -> Result<Option<(usize, Vec<String>)>> {
        if self.cancel.is_cancelled() {
            return Err(SieveError::Cancelled);
        }

        if self.is_visited(url)? {
            tracing::debug!("Skipping already crawled URL: {}", url);
            return Ok(None);
        }

        if self.budget_exhausted() {
            tracing::debug!("Page budget reached, not visiting {}", url);
            return Ok(None);
        }

        if !self.in_scope(url) {
            tracing::debug!("Out of scope: {}", url);
            return Ok(None);
        }

        match self.claim(url)? {
            Claim::Owned => {}
            Claim::Taken => return Ok(None),
            Claim::Volatile(e) => {
                tracing::warn!("Failed to persist visited URL {}: {}", url, e);
            }
        }

        self.pages_visited += 1;
        tracing::info!("Current URL: > {}", url);

        let before = self.interceptor.captured();
        let Some(links) = self.load(page, url).await else {
            return Ok(Some((0, Vec::new())));
        };
        // Exchanges that arrive while the page is being read still belong to it
        let own = self.interceptor.captured().saturating_sub(before);

        let mut fresh = Vec::with_capacity(links.len());
        for link in links {
            if !self.is_visited(&link)? && self.in_scope(&link) {
                fresh.push(link);
            }
        }

        Ok(Some((own, fresh)))
    }

    /// Navigates to `url` and collects the links the page exposes
    ///
    /// Returns `None` when navigation failed. A page whose content cannot be
    /// read yields no links.
    async fn load(&self, page: &mut dyn PageDriver, url: &str) -> Option<Vec<String>> {
        if let Err(e) = page.goto(url, self.wait, self.navigation_timeout).await {
            tracing::warn!("Failed to load {}: {}", url, e);
            return None;
        }

        let html = match page.content().await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!("Could not read content of {}: {}", url, e);
                return Some(Vec::new());
            }
        };

        let base = match page.current_url().await {
            Ok(Some(current)) => Url::parse(&current).ok(),
            _ => None,
        }
        .or_else(|| Url::parse(url).ok());

        let Some(base) = base else {
            return Some(Vec::new());
        };

        let mut links = extract_links(&html, &base);
        tracing::info!("Found {} links on {}", links.len(), url);

        if let Some(discovery) = &self.discovery {
            let mut seen: HashSet<String> = links.iter().cloned().collect();
            let found = links.len();
            for link in discovery.discover(page).await {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
            if links.len() > found {
                tracing::info!("Menus revealed {} more links on {}", links.len() - found, url);
            }
        }

        Some(links)
    }

    fn budget_exhausted(&self) -> bool {
        self.max_pages
            .is_some_and(|max| self.pages_visited >= max)
    }

    fn in_scope(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|parsed| self.scope.admits(&parsed))
            .unwrap_or(false)
    }

    fn is_visited(&self, url: &str) -> Result<bool> {
        let store = self
            .visited
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(store.has(url)?)
    }

    fn claim(&self, url: &str) -> Result<Claim> {
        let mut store = self
            .visited
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        Ok(match store.claim(url) {
            Ok(true) => Claim::Owned,
            Ok(false) => Claim::Taken,
            Err(e) => Claim::Volatile(e),
        })
    }
}
