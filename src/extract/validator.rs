//! Validate-and-retry loop
//!
//! An extraction is accepted only when the number of records equals the
//! count the page announces and every record is complete. Otherwise the
//! configured recovery action runs and extraction is repeated, within a
//! bounded number of attempts and a wall-clock budget.

use crate::browser::PageDriver;
use crate::config::{ExtractionConfig, RecoveryAction};
use crate::extract::{Extraction, ExtractionError, ExtractionStrategy, Materializer};
use crate::state::ValidationState;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Bounds on the reconcile loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first
    pub max_attempts: u32,
    pub max_elapsed: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            max_elapsed: Duration::from_millis(config.max_elapsed_ms),
        }
    }
}

/// Repeats extraction until it is consistent or the policy is exhausted
pub struct Validator<'a> {
    policy: RetryPolicy,
    recovery: RecoveryAction,
    materializer: &'a Materializer,
}

impl<'a> Validator<'a> {
    pub fn new(policy: RetryPolicy, recovery: RecoveryAction, materializer: &'a Materializer) -> Self {
        Self {
            policy,
            recovery,
            materializer,
        }
    }

    /// Extracts from the page as it currently is, retrying on mismatch
    ///
    /// The expected count is re-read on every attempt. `page_url` resolves
    /// relative links when the driver cannot report its current URL.
    pub async fn reconcile(
        &self,
        page: &mut dyn PageDriver,
        strategy: &dyn ExtractionStrategy,
        page_url: &Url,
        cancel: &CancellationToken,
    ) -> Result<Extraction, ExtractionError> {
        let started = Instant::now();
        let mut state = ValidationState::Extracting;
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(ExtractionError::Cancelled);
            }

            attempt += 1;
            let extraction = self.extract_once(page, strategy, page_url).await?;
            state = advance(state, ValidationState::Validating);

            tracing::info!(
                "Total products: {} (extracted {}, attempt {})",
                extraction.expected,
                extraction.records.len(),
                attempt
            );

            if extraction.is_consistent() {
                advance(state, ValidationState::Accepted);
                return Ok(extraction);
            }

            if attempt >= self.policy.max_attempts || started.elapsed() >= self.policy.max_elapsed {
                advance(state, ValidationState::Exhausted);
                return Err(ExtractionError::DidNotConverge {
                    attempts: attempt,
                    expected: extraction.expected,
                    extracted: extraction.records.len(),
                });
            }

            state = advance(state, ValidationState::Retrying);
            tracing::warn!(
                "Mismatch in product data ({} of {} extracted, {} incomplete). Retrying scroll...",
                extraction.records.len(),
                extraction.expected,
                extraction.incomplete()
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
                _ = self.materializer.recover(page, self.recovery) => {}
            }

            state = advance(state, ValidationState::Extracting);
        }
    }

    async fn extract_once(
        &self,
        page: &mut dyn PageDriver,
        strategy: &dyn ExtractionStrategy,
        page_url: &Url,
    ) -> Result<Extraction, ExtractionError> {
        let html = page.content().await?;
        let base = match page.current_url().await? {
            Some(current) => Url::parse(&current).unwrap_or_else(|_| page_url.clone()),
            None => page_url.clone(),
        };
        Ok(strategy.extract(&html, &base))
    }
}

fn advance(from: ValidationState, to: ValidationState) -> ValidationState {
    debug_assert!(from.can_transition_to(to), "{} -> {}", from, to);
    tracing::trace!("Validation {} -> {}", from, to);
    to
}
