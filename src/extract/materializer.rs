//! Scroll-driven lazy loading
//!
//! Listing pages only render items as they scroll into view. The
//! materializer reads the page's scroll metrics, installs an in-page timer
//! that scrolls in small increments, waits for the sequence to finish and
//! then waits once more for in-flight loads to render.
//!
//! Failures here are never fatal: the validator decides whether the page
//! ended up complete.

use crate::browser::{BrowserError, BrowserResult, PageDriver};
use crate::config::{MaterializerConfig, RecoveryAction};
use serde::Deserialize;
use std::time::Duration;

const METRICS_SCRIPT: &str = "(() => ({ scrollHeight: document.documentElement.scrollHeight, scrollY: window.scrollY }))()";

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScrollMetrics {
    scroll_height: f64,
    scroll_y: f64,
}

/// Increment size and number of timer ticks for one forward scroll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPlan {
    /// Pixels per tick
    pub step: f64,
    pub ticks: u32,
}

impl ScrollPlan {
    /// Plans a scroll from `scroll_y` to the bottom of the document
    ///
    /// The step is the remaining distance divided by `scroll_divisor`,
    /// capped at `max_step_px`. The tick count covers the distance and never
    /// exceeds `max_ticks`.
    ///
    /// ```
    /// use netsieve::config::MaterializerConfig;
    /// use netsieve::extract::ScrollPlan;
    ///
    /// let plan = ScrollPlan::compute(5_000.0, 0.0, &MaterializerConfig::default());
    /// assert_eq!(plan.step, 10.0);
    /// assert_eq!(plan.ticks, 500);
    /// ```
    pub fn compute(scroll_height: f64, scroll_y: f64, config: &MaterializerConfig) -> Self {
        let distance = (scroll_height - scroll_y).max(0.0);
        let step = (distance / config.scroll_divisor).min(config.max_step_px);

        if !step.is_finite() || step <= 0.0 {
            return Self { step: 0.0, ticks: 0 };
        }

        let ticks = (distance / step).ceil().min(config.max_ticks as f64) as u32;
        Self { step, ticks }
    }

    /// How long the in-page timer runs
    pub fn duration(&self, interval: Duration) -> Duration {
        interval * self.ticks
    }

    fn script(&self, interval: Duration) -> String {
        format!(
            "(() => {{ \
               let remaining = {ticks}; \
               const timer = setInterval(() => {{ \
                 window.scrollBy(0, {step}); \
                 remaining -= 1; \
                 const bottom = window.scrollY + window.innerHeight >= document.documentElement.scrollHeight; \
                 if (remaining <= 0 || bottom) clearInterval(timer); \
               }}, {interval}); \
               return true; \
             }})()",
            ticks = self.ticks,
            step = self.step,
            interval = interval.as_millis(),
        )
    }
}

/// Drives a page until its lazily-loaded content has rendered
#[derive(Debug, Clone)]
pub struct Materializer {
    config: MaterializerConfig,
}

impl Materializer {
    pub fn new(config: MaterializerConfig) -> Self {
        Self { config }
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.config.scroll_interval_ms)
    }

    /// Scrolls to the bottom, then settles
    ///
    /// The settle wait always happens, even when scrolling failed.
    pub async fn materialize(&self, page: &mut dyn PageDriver) {
        match self.scroll_forward(page).await {
            Ok(plan) => tracing::debug!("Scrolled {} ticks of {}px", plan.ticks, plan.step),
            Err(e) => tracing::warn!("Scroll failed: {}", e),
        }

        page.wait_for_timeout(Duration::from_millis(self.config.settle_ms))
            .await;
    }

    /// Runs one recovery action before the next extraction attempt
    pub async fn recover(&self, page: &mut dyn PageDriver, action: RecoveryAction) {
        match action {
            RecoveryAction::Forward => self.materialize(page).await,
            RecoveryAction::ScrollBack => {
                let script = format!("window.scrollBy(0, -{})", self.config.scroll_back_px);
                if let Err(e) = page.evaluate(&script).await {
                    tracing::warn!("Scroll back failed: {}", e);
                }
                page.wait_for_timeout(Duration::from_millis(self.config.scroll_back_pause_ms))
                    .await;
                self.materialize(page).await;
            }
        }
    }

    async fn scroll_forward(&self, page: &mut dyn PageDriver) -> BrowserResult<ScrollPlan> {
        let value = page.evaluate(METRICS_SCRIPT).await?;
        let metrics: ScrollMetrics = serde_json::from_value(value)
            .map_err(|e| BrowserError::Script(format!("unexpected scroll metrics: {}", e)))?;

        let plan = ScrollPlan::compute(metrics.scroll_height, metrics.scroll_y, &self.config);
        if plan.ticks == 0 {
            return Ok(plan);
        }

        page.evaluate(&plan.script(self.interval())).await?;
        page.wait_for_timeout(plan.duration(self.interval())).await;
        Ok(plan)
    }
}
