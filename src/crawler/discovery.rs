//! Hover-driven menu discovery
//!
//! Navigation menus often only render their category links while the
//! pointer is over them, so those links never appear in the static DOM.
//! Each menu candidate is hovered in turn, followed by its nested lists, and
//! every anchor that is visible afterwards is collected.
//!
//! Hovering is simulated with dispatched mouse events, so it needs a driver
//! that evaluates scripts. On any other driver discovery finds nothing.

use crate::browser::{BrowserError, BrowserResult, PageDriver};
use crate::config::DiscoveryConfig;
use std::collections::HashSet;
use std::time::Duration;

const VISIBLE_LINKS_SCRIPT: &str = "(() => Array.from(document.querySelectorAll('a')) \
    .filter(a => { \
      const rect = a.getBoundingClientRect(); \
      const style = window.getComputedStyle(a); \
      return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none'; \
    }) \
    .map(a => a.href) \
    .filter(href => href.startsWith('http')))()";

/// Reveals links hidden behind hover menus
#[derive(Debug, Clone)]
pub struct MenuDiscovery {
    config: DiscoveryConfig,
}

impl MenuDiscovery {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Hovers every menu candidate on the current page
    ///
    /// Returns the visible links in the order they were first seen. Failures
    /// on one candidate are logged and the next candidate is tried.
    pub async fn discover(&self, page: &mut dyn PageDriver) -> Vec<String> {
        let candidates = match self.count_candidates(page).await {
            Ok(count) => count.min(self.config.max_candidates),
            Err(e) => {
                tracing::debug!("Menu discovery skipped: {}", e);
                return Vec::new();
            }
        };
        tracing::debug!("Found {} potential menu elements", candidates);

        let mut found = FoundLinks::default();
        match visible_links(page).await {
            Ok(links) => {
                found.extend(links);
            }
            Err(e) => tracing::warn!("Could not read visible links: {}", e),
        }

        for index in 0..candidates {
            if let Err(e) = self.explore_candidate(page, index, &mut found).await {
                tracing::warn!("Error while processing menu candidate {}: {}", index, e);
            }
        }

        found.links
    }

    async fn explore_candidate(
        &self,
        page: &mut dyn PageDriver,
        index: u32,
        found: &mut FoundLinks,
    ) -> BrowserResult<()> {
        let nested = page
            .evaluate(&hover_script(&self.config.menu_selector, index, &self.config.nested_selector))
            .await?;
        let nested = nested.as_u64().unwrap_or(0) as u32;

        page.wait_for_timeout(Duration::from_millis(self.config.hover_pause_ms))
            .await;
        let revealed = found.extend(visible_links(page).await?);
        tracing::debug!("Hovering menu candidate {} revealed {} links", index, revealed);

        for child in 0..nested.min(self.config.max_nested) {
            page.evaluate(&nested_hover_script(
                &self.config.menu_selector,
                index,
                &self.config.nested_selector,
                child,
            ))
            .await?;
            page.wait_for_timeout(Duration::from_millis(self.config.nested_pause_ms))
                .await;
            found.extend(visible_links(page).await?);
        }

        Ok(())
    }

    async fn count_candidates(&self, page: &mut dyn PageDriver) -> BrowserResult<u32> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(&self.config.menu_selector)
        );
        page.evaluate(&script)
            .await?
            .as_u64()
            .map(|count| count.min(u32::MAX as u64) as u32)
            .ok_or_else(|| BrowserError::Script("menu candidate count is not a number".to_string()))
    }
}

#[derive(Default)]
struct FoundLinks {
    seen: HashSet<String>,
    links: Vec<String>,
}

impl FoundLinks {
    /// Adds unseen links, returning how many were new
    fn extend(&mut self, links: Vec<String>) -> usize {
        let before = self.links.len();
        for link in links {
            if self.seen.insert(link.clone()) {
                self.links.push(link);
            }
        }
        self.links.len() - before
    }
}

async fn visible_links(page: &mut dyn PageDriver) -> BrowserResult<Vec<String>> {
    let value = page.evaluate(VISIBLE_LINKS_SCRIPT).await?;
    serde_json::from_value(value)
        .map_err(|e| BrowserError::Script(format!("unexpected visible links: {}", e)))
}

/// Quotes `value` as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

const HOVER_FN: &str = "const hover = el => { \
      el.scrollIntoView({ block: 'center' }); \
      el.dispatchEvent(new MouseEvent('mouseover', { bubbles: true, view: window })); \
      el.dispatchEvent(new MouseEvent('mouseenter', { bubbles: false, view: window })); \
    };";

/// Hovers candidate `index` and returns how many nested elements it has
fn hover_script(menu_selector: &str, index: u32, nested_selector: &str) -> String {
    format!(
        "(() => {{ {hover} \
           const el = document.querySelectorAll({menu})[{index}]; \
           if (!el) return 0; \
           hover(el); \
           return el.querySelectorAll({nested}).length; \
         }})()",
        hover = HOVER_FN,
        menu = js_string(menu_selector),
        index = index,
        nested = js_string(nested_selector),
    )
}

fn nested_hover_script(menu_selector: &str, index: u32, nested_selector: &str, child: u32) -> String {
    format!(
        "(() => {{ {hover} \
           const el = document.querySelectorAll({menu})[{index}]; \
           const nested = el && el.querySelectorAll({nested})[{child}]; \
           if (!nested) return false; \
           hover(nested); \
           return true; \
         }})()",
        hover = HOVER_FN,
        menu = js_string(menu_selector),
        index = index,
        nested = js_string(nested_selector),
        child = child,
    )
}
