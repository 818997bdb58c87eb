//! Listing extraction
//!
//! Drives a single listing page to "fully rendered" and reads structured
//! records from it:
//!
//! 1. Navigate and wait for the first item to appear
//! 2. Scroll through the page so lazily-loaded items render ([`materializer`])
//! 3. Extract the expected count and the records ([`ExtractionStrategy`])
//! 4. Validate and retry until the two agree ([`validator`])
//!
//! Site-specific knowledge lives entirely in the strategy; everything else
//! is site-agnostic.

pub mod listing;
pub mod materializer;
pub mod numerals;
pub mod validator;

pub use listing::ListingStrategy;
pub use materializer::{Materializer, ScrollPlan};
pub use validator::{RetryPolicy, Validator};

use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, PageDriver};
use crate::config::{Config, WaitCondition};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Errors raised while extracting a listing
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error(
        "Extraction did not converge: could not reconcile extracted record count \
         (expected {expected}, extracted {extracted} after {attempts} attempts)"
    )]
    DidNotConverge {
        attempts: u32,
        expected: u64,
        extracted: usize,
    },

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Invalid page URL: {0}")]
    InvalidUrl(String),

    #[error("Extraction cancelled")]
    Cancelled,
}

/// One item read from a listing page
///
/// Missing fields are empty strings rather than errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    /// 1-based position on the page
    pub index: usize,

    pub name: String,

    #[serde(rename = "link")]
    pub detail_link: String,

    pub price: String,

    #[serde(rename = "image")]
    pub image_url: String,
}

impl ExtractedRecord {
    /// True when name, price and image are all present
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.price.is_empty() && !self.image_url.is_empty()
    }
}

/// What a strategy read from the current DOM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Item count announced by the page, 0 when absent or unparseable
    pub expected: u64,
    pub records: Vec<ExtractedRecord>,
}

impl Extraction {
    /// The acceptance predicate of the validator
    pub fn is_consistent(&self) -> bool {
        self.records.len() as u64 == self.expected
            && self.records.iter().all(ExtractedRecord::is_complete)
    }

    /// Records missing a name, price or image
    pub fn incomplete(&self) -> usize {
        self.records.iter().filter(|r| !r.is_complete()).count()
    }
}

/// Site-specific mapping from a rendered page to records
///
/// Implementations are deterministic with respect to the DOM they are given
/// and never retry internally. A malformed item must not prevent the rest
/// from being extracted.
pub trait ExtractionStrategy: Send + Sync {
    /// Selector whose presence means the listing has started rendering
    fn ready_selector(&self) -> &str;

    /// Reads the expected count and the records from `html`
    ///
    /// Relative links are resolved against `base_url`.
    fn extract(&self, html: &str, base_url: &Url) -> Extraction;
}

/// Runs the full pipeline on an already-open page
pub async fn run_extraction(
    page: &mut dyn PageDriver,
    url: &str,
    config: &Config,
    strategy: &dyn ExtractionStrategy,
    cancel: &CancellationToken,
) -> Result<Extraction, ExtractionError> {
    let target = Url::parse(url).map_err(|e| ExtractionError::InvalidUrl(format!("{}: {}", url, e)))?;

    tracing::info!("Navigating to {}...", url);
    page.goto(
        url,
        WaitCondition::DomContentLoaded,
        Duration::from_millis(config.extraction.navigation_timeout_ms),
    )
    .await?;

    page.wait_for_selector(
        strategy.ready_selector(),
        Duration::from_millis(config.extraction.item_wait_timeout_ms),
    )
    .await?;

    let materializer = Materializer::new(config.materializer.clone());
    materializer.materialize(page).await;

    let validator = Validator::new(
        RetryPolicy::from_config(&config.extraction),
        config.extraction.recovery,
        &materializer,
    );
    validator.reconcile(page, strategy, &target, cancel).await
}

/// Launches a session, extracts one listing and closes the session
pub async fn extract_listing(
    launcher: &dyn BrowserLauncher,
    config: &Config,
    strategy: &dyn ExtractionStrategy,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Extraction, ExtractionError> {
    let mut session = launcher.launch().await?;
    let outcome = extract_in_session(session.as_mut(), config, strategy, url, cancel).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close browser: {}", e);
    }

    outcome
}

async fn extract_in_session(
    session: &mut dyn BrowserSession,
    config: &Config,
    strategy: &dyn ExtractionStrategy,
    url: &str,
    cancel: &CancellationToken,
) -> Result<Extraction, ExtractionError> {
    let mut page = session.new_page().await?;
    let outcome = run_extraction(page.as_mut(), url, config, strategy, cancel).await;
    if let Err(e) = page.close().await {
        tracing::debug!("Failed to close page: {}", e);
    }
    outcome
}
