//! Selector-driven listing strategy
//!
//! Every site-specific detail (which element is an item, where the name and
//! price live, how the total is announced) comes from `[extraction]` in the
//! configuration.

use crate::config::ExtractionConfig;
use crate::extract::numerals::parse_count;
use crate::extract::{ExtractedRecord, Extraction, ExtractionStrategy};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Reads a product listing with configured CSS selectors
#[derive(Debug, Clone)]
pub struct ListingStrategy {
    item: String,
    count: String,
    link: String,
    name: String,
    price: String,
    images: Vec<String>,
}

/// Selectors compiled for one extraction pass
struct Compiled {
    item: Selector,
    count: Option<Selector>,
    link: Option<Selector>,
    name: Option<Selector>,
    price: Option<Selector>,
    images: Vec<Selector>,
}

impl ListingStrategy {
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self {
            item: config.item_selector.clone(),
            count: config.count_selector.clone(),
            link: config.link_selector.clone(),
            name: config.name_selector.clone(),
            price: config.price_selector.clone(),
            images: config.image_selectors.clone(),
        }
    }

    /// Compiles the selectors, `None` when the item selector itself is invalid
    ///
    /// Configuration validation rejects bad selectors up front; a field
    /// selector that still fails to parse simply yields empty fields.
    fn compile(&self) -> Option<Compiled> {
        let item = compile_selector(&self.item)?;
        Some(Compiled {
            item,
            count: compile_selector(&self.count),
            link: compile_selector(&self.link),
            name: compile_selector(&self.name),
            price: compile_selector(&self.price),
            images: self
                .images
                .iter()
                .filter_map(|s| compile_selector(s))
                .collect(),
        })
    }
}

fn compile_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(compiled) => Some(compiled),
        Err(_) => {
            tracing::warn!("Ignoring invalid selector: {}", selector);
            None
        }
    }
}

impl ExtractionStrategy for ListingStrategy {
    fn ready_selector(&self) -> &str {
        &self.item
    }

    fn extract(&self, html: &str, base_url: &Url) -> Extraction {
        let Some(selectors) = self.compile() else {
            return Extraction::default();
        };

        let document = Html::parse_document(html);

        let expected = selectors
            .count
            .as_ref()
            .and_then(|s| document.select(s).next())
            .map(|summary| parse_count(&element_text(summary)))
            .unwrap_or(0);

        let records = document
            .select(&selectors.item)
            .enumerate()
            .map(|(i, item)| read_item(&selectors, item, i + 1, base_url))
            .collect();

        Extraction { expected, records }
    }
}

/// Reads one item; absent fields become empty strings
fn read_item(selectors: &Compiled, item: ElementRef<'_>, index: usize, base_url: &Url) -> ExtractedRecord {
    let detail_link = first_match(item, selectors.link.as_ref())
        .and_then(|a| a.value().attr("href"))
        .map(|href| resolve(href, base_url))
        .unwrap_or_default();

    let name = first_match(item, selectors.name.as_ref())
        .map(element_text)
        .unwrap_or_default();

    let price = first_match(item, selectors.price.as_ref())
        .map(element_text)
        .unwrap_or_default();

    let image_url = selectors
        .images
        .iter()
        .find_map(|s| item.select(s).next())
        .and_then(|image| image_source(image, base_url))
        .unwrap_or_default();

    ExtractedRecord {
        index,
        name,
        detail_link,
        price,
        image_url,
    }
}

fn first_match<'a>(item: ElementRef<'a>, selector: Option<&Selector>) -> Option<ElementRef<'a>> {
    selector.and_then(|s| item.select(s).next())
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// `src` resolved to an absolute URL, falling back to the raw `srcset`
fn image_source(image: ElementRef<'_>, base_url: &Url) -> Option<String> {
    let element = image.value();
    if let Some(src) = element.attr("src").filter(|s| !s.trim().is_empty()) {
        return Some(resolve(src, base_url));
    }
    element
        .attr("srcset")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn resolve(href: &str, base_url: &Url) -> String {
    let href = href.trim();
    base_url
        .join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> ListingStrategy {
        let mut config = ExtractionConfig::default();
        config.count_selector = ".total".to_string();
        config.item_selector = ".item".to_string();
        ListingStrategy::from_config(&config)
    }

    fn base() -> Url {
        Url::parse("https://shop.example.com/search/phones/").unwrap()
    }

    #[test]
    fn test_extracts_all_items_even_when_one_is_incomplete() {
        let html = r#"
            <span class="total">۵ کالا</span>
            <div class="item"><a href="/p/1"><h3> One </h3></a><span data-testid="price-final">۱۰</span>
                <picture><source type="image/webp" srcset="https://img.example.com/1.webp"><img src="/1.jpg"></picture></div>
            <div class="item"><a href="/p/2"><h3>Two</h3></a><span data-testid="price-final">20</span>
                <picture><img src="/2.jpg"></picture></div>
            <div class="item"><a href="/p/3"><h3>Three</h3></a>
                <picture><img src="/3.jpg"></picture></div>
            <div class="item"><a href="/p/4"><h3>Four</h3></a><span data-testid="price-final">40</span>
                <picture><img src="/4.jpg"></picture></div>
            <div class="item"><a href="/p/5"><h3>Five</h3></a><span data-testid="price-final">50</span>
                <picture><img src="/5.jpg"></picture></div>
        "#;

        let extraction = strategy().extract(html, &base());

        assert_eq!(extraction.expected, 5);
        assert_eq!(extraction.records.len(), 5);
        assert_eq!(
            extraction.records.iter().filter(|r| r.is_complete()).count(),
            4
        );
        assert_eq!(extraction.records[2].price, "");
        assert!(!extraction.is_consistent());
    }

    #[test]
    fn test_fields_are_trimmed_and_resolved() {
        let html = r#"
            <div class="item"><a href="../p/7?ref=list"><h3>
                Phone X
            </h3></a><span data-testid="price-final"> ۱۲٬۰۰۰ </span>
            <picture><img src="img/7.jpg"></picture></div>
        "#;

        let record = &strategy().extract(html, &base()).records[0];
        assert_eq!(record.index, 1);
        assert_eq!(record.name, "Phone X");
        assert_eq!(record.price, "۱۲٬۰۰۰");
        assert_eq!(record.detail_link, "https://shop.example.com/search/p/7?ref=list");
        assert_eq!(record.image_url, "https://shop.example.com/search/phones/img/7.jpg");
    }

    #[test]
    fn test_webp_source_preferred_and_srcset_kept_raw() {
        let html = r#"
            <div class="item"><picture>
                <source type="image/webp" srcset="a.webp 1x, b.webp 2x">
                <img src="/fallback.jpg">
            </picture></div>
        "#;

        let record = &strategy().extract(html, &base()).records[0];
        assert_eq!(record.image_url, "a.webp 1x, b.webp 2x");
    }

    #[test]
    fn test_missing_count_is_zero() {
        let extraction = strategy().extract("<div class='item'></div>", &base());
        assert_eq!(extraction.expected, 0);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0], ExtractedRecord {
            index: 1,
            ..ExtractedRecord::default()
        });
    }

    #[test]
    fn test_ready_selector_is_item_selector() {
        assert_eq!(strategy().ready_selector(), ".item");
    }
}
