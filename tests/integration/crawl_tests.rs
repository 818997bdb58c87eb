//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl-and-capture cycle through the HTTP page driver.

use netsieve::browser::HttpLauncher;
use netsieve::config::{BrowserEngine, Config, ExchangeFormat, StorageBackend, TraversalOrder};
use netsieve::crawler::run_crawl;
use netsieve::storage::{open_storage, ExchangeLog, VisitedStore};
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration writing its files under `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.browser.engine = BrowserEngine::Http;
    config.browser.request_timeout_ms = 5_000;
    config.crawler.navigation_timeout_ms = 5_000;
    config.output.visited_path = dir.join("crawled_urls.json").display().to_string();
    config.output.exchanges_path = dir.join("api_data.json").display().to_string();
    config.output.database_path = dir.join("netsieve.db").display().to_string();
    config
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Mounts a small site:
///
/// ```text
/// /        -> /page1, /api/items, /#top
/// /page1   -> /, /api/other, /broken
/// /broken  -> 500
/// ```
async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r##"<a href="/page1">Page 1</a><a href="/api/items">Items</a><a href="#top">Top</a>"##,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_page(
            r#"<a href="/">Home</a><a href="/api/other">Other</a><a href="/broken">Broken</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": [1, 2]})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/other"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_full_crawl_captures_json_endpoints() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let seed = format!("{}/", mock_server.uri());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let (visited, exchanges) = open_storage(&config.output).unwrap();
    let launcher = HttpLauncher::new(config.browser.clone());

    let summary = run_crawl(
        &config,
        &launcher,
        visited.clone(),
        exchanges.clone(),
        &seed,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    // /, /page1, /api/other, /broken, /api/items, /#top
    assert_eq!(summary.pages_visited, 6);
    assert_eq!(summary.captured, 2);

    let logged = exchanges.lock().unwrap().exchanges().unwrap();
    let mut endpoints: Vec<&str> = logged.iter().map(|e| e.request_url.as_str()).collect();
    endpoints.sort();
    assert_eq!(
        endpoints,
        vec![
            format!("{}/api/items", mock_server.uri()),
            format!("{}/api/other", mock_server.uri()),
        ]
    );
    assert!(logged.iter().all(|e| e.origin_page_url.is_some()));
    assert!(logged.iter().all(|e| e.content_type.contains("application/json")));

    // The failed page stays visited
    let visited = visited.lock().unwrap();
    assert_eq!(visited.len().unwrap(), 6);
    assert!(visited
        .has(&format!("{}/broken", mock_server.uri()))
        .unwrap());
    // Fragment links keep their exact form
    assert!(visited.has(&format!("{}/#top", mock_server.uri())).unwrap());
}

#[tokio::test]
async fn test_second_run_makes_no_navigation() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let seed = format!("{}/", mock_server.uri());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let launcher = HttpLauncher::new(config.browser.clone());

    {
        let (visited, exchanges) = open_storage(&config.output).unwrap();
        run_crawl(&config, &launcher, visited, exchanges, &seed, CancellationToken::new())
            .await
            .unwrap();
    }
    let after_first = request_count(&mock_server).await;
    assert!(after_first > 0);

    // Fresh handles re-read the files written by the first run
    let (visited, exchanges) = open_storage(&config.output).unwrap();
    let summary = run_crawl(
        &config,
        &launcher,
        visited,
        exchanges.clone(),
        &seed,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(summary.pages_visited, 0);
    assert_eq!(summary.captured, 0);
    assert_eq!(request_count(&mock_server).await, after_first);

    // The log loaded at start still holds the first run's exchanges
    assert_eq!(exchanges.lock().unwrap().len().unwrap(), 2);
}

#[tokio::test]
async fn test_visited_file_is_a_json_array() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let seed = format!("{}/", mock_server.uri());

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let (visited, exchanges) = open_storage(&config.output).unwrap();
    let launcher = HttpLauncher::new(config.browser.clone());

    run_crawl(&config, &launcher, visited, exchanges, &seed, CancellationToken::new())
        .await
        .unwrap();

    let content = std::fs::read_to_string(&config.output.visited_path).unwrap();
    let urls: Vec<String> = serde_json::from_str(&content).unwrap();
    assert_eq!(urls.first(), Some(&seed));
    assert_eq!(urls.len(), 6);
}

#[tokio::test]
async fn test_breadth_first_with_csv_log() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let seed = format!("{}/", mock_server.uri());

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.traversal = TraversalOrder::BreadthFirst;
    config.output.exchanges_format = ExchangeFormat::Csv;
    config.output.exchanges_path = dir.path().join("api_urls.csv").display().to_string();

    let (visited, exchanges) = open_storage(&config.output).unwrap();
    let launcher = HttpLauncher::new(config.browser.clone());

    let summary = run_crawl(&config, &launcher, visited, exchanges, &seed, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.captured, 2);

    let content = std::fs::read_to_string(&config.output.exchanges_path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("request_url,origin_page_url,content_type,observed_at")
    );
    assert_eq!(lines.count(), 2);
}

#[tokio::test]
async fn test_page_budget_limits_navigation() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let seed = format!("{}/", mock_server.uri());

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.max_pages = Some(2);

    let (visited, exchanges) = open_storage(&config.output).unwrap();
    let launcher = HttpLauncher::new(config.browser.clone());

    let summary = run_crawl(&config, &launcher, visited, exchanges, &seed, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 2);
    assert_eq!(request_count(&mock_server).await, 2);
}

#[tokio::test]
async fn test_excluded_domain_is_never_fetched() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let seed = format!("{}/", mock_server.uri());

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.crawler.excluded_domains = vec!["127.0.0.1".to_string()];

    let (visited, exchanges) = open_storage(&config.output).unwrap();
    let launcher = HttpLauncher::new(config.browser.clone());

    let summary = run_crawl(&config, &launcher, visited, exchanges, &seed, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.pages_visited, 0);
    assert_eq!(request_count(&mock_server).await, 0);
}

#[tokio::test]
async fn test_sqlite_backend_round_trip() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    let seed = format!("{}/", mock_server.uri());

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(dir.path());
    config.output.backend = StorageBackend::Sqlite;
    let launcher = HttpLauncher::new(config.browser.clone());

    {
        let (visited, exchanges) = open_storage(&config.output).unwrap();
        let summary =
            run_crawl(&config, &launcher, visited, exchanges, &seed, CancellationToken::new())
                .await
                .unwrap();
        assert_eq!(summary.captured, 2);
    }

    let (visited, exchanges) = open_storage(&config.output).unwrap();
    assert_eq!(VisitedStore::len(&*visited.lock().unwrap()).unwrap(), 6);
    assert_eq!(ExchangeLog::len(&*exchanges.lock().unwrap()).unwrap(), 2);
}
