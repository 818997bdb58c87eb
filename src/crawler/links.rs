//! Outbound link extraction
//!
//! Reads every `<a href>` in a rendered document and resolves it against the
//! page URL, the way a browser computes `anchor.href`.

use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracts absolute http(s) links from an HTML document
///
/// # Link Rules
///
/// **Include:**
/// - Every `<a href="...">`, relative and fragment-only hrefs resolved
///   against `base_url`
///
/// **Exclude:**
/// - Empty hrefs
/// - Anything that does not resolve to an `http` or `https` URL
///   (`javascript:`, `mailto:`, `tel:`, `data:` ...)
///
/// Links keep their exact resolved form (query and fragment included) and
/// are returned once each, in document order.
///
/// # Example
///
/// ```
/// use netsieve::crawler::extract_links;
/// use url::Url;
///
/// let html = r##"<a href="/cart">Cart</a><a href="#top">Top</a><a href="tel:123">Call</a>"##;
/// let base = Url::parse("https://shop.example.com/list/").unwrap();
/// assert_eq!(
///     extract_links(html, &base),
///     vec!["https://shop.example.com/cart", "https://shop.example.com/list/#top"]
/// );
/// ```
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(anchor) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&anchor) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(link) = resolve_link(href, base_url) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    links
}

fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute.to_string()),
        _ => None,
    }
}
