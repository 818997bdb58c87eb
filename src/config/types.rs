use serde::Deserialize;

/// Main configuration structure for Netsieve
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub materializer: MaterializerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Order in which discovered links are explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraversalOrder {
    /// Recurse into each link as soon as it is found
    DepthFirst,
    /// Explore level by level from an explicit work queue
    BreadthFirst,
}

/// Page lifecycle event a navigation waits for before returning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WaitCondition {
    DomContentLoaded,
    Load,
    /// Load, then no request in flight for `[browser] network-idle-ms`
    NetworkIdle,
}

/// Crawl traversal configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// URL the crawl starts from
    pub seed_url: String,

    /// Depth-first recursion or breadth-first work queue
    pub traversal: TraversalOrder,

    /// What a navigation waits for
    pub wait_condition: WaitCondition,

    /// Upper bound for a single navigation (milliseconds)
    pub navigation_timeout_ms: u64,

    /// Stop claiming new pages after this many (unbounded when absent)
    pub max_pages: Option<u32>,

    /// Domain patterns the crawl may enter (all domains when empty)
    pub allowed_domains: Vec<String>,

    /// Domain patterns the crawl never enters
    pub excluded_domains: Vec<String>,

    /// Hover-driven menu link discovery (`[crawler.discovery]`)
    pub discovery: DiscoveryConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: "https://www.digikala.com/".to_string(),
            traversal: TraversalOrder::DepthFirst,
            wait_condition: WaitCondition::NetworkIdle,
            navigation_timeout_ms: 60_000,
            max_pages: None,
            allowed_domains: Vec::new(),
            excluded_domains: Vec::new(),
            discovery: DiscoveryConfig::default(),
        }
    }
}

/// Menu discovery configuration
///
/// Needs a driver that runs scripts; the HTTP driver skips it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DiscoveryConfig {
    pub enabled: bool,

    /// Elements hovered to reveal their menus
    pub menu_selector: String,

    /// Descendants of a hovered menu that are hovered in turn
    pub nested_selector: String,

    /// Most menu candidates hovered on one page
    pub max_candidates: u32,

    /// Most nested elements hovered per candidate
    pub max_nested: u32,

    /// Wait after hovering a candidate (milliseconds)
    pub hover_pause_ms: u64,

    /// Wait after hovering a nested element (milliseconds)
    pub nested_pause_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            menu_selector: r#"[id*="menu"], [class*="menu"], [data-cro-id*="menu"]"#.to_string(),
            nested_selector: "ul, .submenu".to_string(),
            max_candidates: 50,
            max_nested: 20,
            hover_pause_ms: 1_000,
            nested_pause_ms: 500,
        }
    }
}

/// Which browser driver renders pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrowserEngine {
    /// Headless Chromium over the DevTools protocol
    Chromium,
    /// Plain HTTP fetches, no script execution
    Http,
}

/// Browser driver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BrowserConfig {
    pub engine: BrowserEngine,

    /// Run Chromium without a window
    pub headless: bool,

    /// Explicit Chromium executable (auto-detected when absent)
    pub chrome_path: Option<String>,

    /// Overrides the driver's default user agent
    pub user_agent: Option<String>,

    /// How long no request may be in flight before the network counts as
    /// idle (milliseconds)
    pub network_idle_ms: u64,

    /// Upper bound for a single DevTools or HTTP request (milliseconds)
    pub request_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            engine: BrowserEngine::Chromium,
            headless: true,
            chrome_path: None,
            user_agent: None,
            network_idle_ms: 500,
            request_timeout_ms: 30_000,
        }
    }
}

/// Recovery action the validator runs between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryAction {
    /// Repeat the forward scroll
    Forward,
    /// Scroll back a fixed offset, pause, then scroll forward again
    ScrollBack,
}

/// Listing extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractionConfig {
    pub item_selector: String,
    pub count_selector: String,
    pub link_selector: String,
    pub name_selector: String,
    pub price_selector: String,

    /// Tried in order; the first matching element supplies the image
    pub image_selectors: Vec<String>,

    pub navigation_timeout_ms: u64,

    /// How long to wait for the first item to appear
    pub item_wait_timeout_ms: u64,

    /// Extraction attempts before giving up, including the first
    pub max_attempts: u32,

    /// Wall-clock budget for the whole reconcile loop (milliseconds)
    pub max_elapsed_ms: u64,

    pub recovery: RecoveryAction,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            item_selector: "[class*='product-list_ProductList__item__']".to_string(),
            count_selector:
                ".text-neutral-500.whitespace-nowrap.text-body-2.ellispis-1.xl\\:flex.items-center.gap-2"
                    .to_string(),
            link_selector: "a".to_string(),
            name_selector: "h3".to_string(),
            price_selector: "span[data-testid='price-final']".to_string(),
            image_selectors: vec![
                "picture source[type='image/webp']".to_string(),
                "picture img".to_string(),
            ],
            navigation_timeout_ms: 60_000,
            item_wait_timeout_ms: 10_000,
            max_attempts: 8,
            max_elapsed_ms: 180_000,
            recovery: RecoveryAction::ScrollBack,
        }
    }
}

/// Scroll-driven lazy loading configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MaterializerConfig {
    /// Timer period between scroll increments (milliseconds)
    pub scroll_interval_ms: u64,

    /// Remaining distance is divided by this to size each increment
    pub scroll_divisor: f64,

    /// Largest single increment (pixels)
    pub max_step_px: f64,

    /// Length of the timer sequence
    pub max_ticks: u32,

    /// Wait after scrolling for in-flight loads to render (milliseconds)
    pub settle_ms: u64,

    /// Backward offset for the recovery variant (pixels)
    pub scroll_back_px: f64,

    /// Pause after scrolling back (milliseconds)
    pub scroll_back_pause_ms: u64,
}

impl Default for MaterializerConfig {
    fn default() -> Self {
        Self {
            scroll_interval_ms: 20,
            scroll_divisor: 100.0,
            max_step_px: 10.0,
            max_ticks: 3_000,
            settle_ms: 5_000,
            scroll_back_px: 500.0,
            scroll_back_pause_ms: 2_000,
        }
    }
}

/// Persistence backend for visited URLs and captured exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// Whole-file JSON (and optionally CSV) collections
    Files,
    /// A single SQLite database
    Sqlite,
}

/// On-disk format of the captured-exchange log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExchangeFormat {
    Json,
    Csv,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    pub backend: StorageBackend,

    /// JSON array of visited URLs
    pub visited_path: String,

    /// Captured exchange log
    pub exchanges_path: String,

    pub exchanges_format: ExchangeFormat,

    /// Path to the SQLite database file
    pub database_path: String,

    /// HTML report of extracted records
    pub report_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Files,
            visited_path: "crawled_urls.json".to_string(),
            exchanges_path: "api_data.json".to_string(),
            exchanges_format: ExchangeFormat::Json,
            database_path: "netsieve.db".to_string(),
            report_path: "product_list.html".to_string(),
        }
    }
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerConfig {
    /// Socket address the endpoint listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}
