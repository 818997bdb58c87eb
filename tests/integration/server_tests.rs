//! Integration tests for the extraction endpoint
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! listing pages are served by wiremock and fetched with the HTTP driver.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use netsieve::browser::HttpLauncher;
use netsieve::config::{BrowserEngine, Config};
use netsieve::server::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    let mut config = Config::default();
    config.browser.engine = BrowserEngine::Http;
    config.browser.request_timeout_ms = 5_000;
    config.extraction.count_selector = ".summary".to_string();
    config.extraction.item_selector = ".product".to_string();
    config.extraction.navigation_timeout_ms = 5_000;
    config.extraction.item_wait_timeout_ms = 1_000;
    config.extraction.max_attempts = 2;
    config.materializer.settle_ms = 0;
    config.materializer.scroll_back_pause_ms = 0;
    config
}

fn app() -> axum::Router {
    let config = test_config();
    let launcher = Arc::new(HttpLauncher::new(config.browser.clone()));
    router(AppState::new(config, launcher))
}

fn product(n: u32, with_price: bool) -> String {
    let price = if with_price {
        format!(r#"<span data-testid="price-final">{}</span>"#, n * 100)
    } else {
        String::new()
    };
    format!(
        r#"<div class="product"><a href="/p/{n}"><h3>Product {n}</h3></a>{price}<picture><img src="/img/{n}.jpg"></picture></div>"#,
        n = n,
        price = price
    )
}

fn listing(summary: &str, products: &[String]) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            r#"<html><body><div class="summary">{}</div>{}</body></html>"#,
            summary,
            products.concat()
        ))
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn fetch_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/fetch-products")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_missing_url_returns_400() {
    let response = app().oneshot(fetch_request(json!({}))).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({"error": "URL is required"}));
}

#[tokio::test]
async fn test_extracts_listing_with_persian_count() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/phones/"))
        .respond_with(listing(
            "۳ کالا",
            &[product(1, true), product(2, true), product(3, true)],
        ))
        .mount(&mock_server)
        .await;

    let url = format!("{}/search/phones/", mock_server.uri());
    let response = app()
        .oneshot(fetch_request(json!({ "url": url })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["totalProducts"], 3);

    let products = body["products"].as_array().unwrap();
    assert_eq!(products.len(), 3);
    assert_eq!(products[0]["index"], 1);
    assert_eq!(products[0]["name"], "Product 1");
    assert_eq!(products[0]["price"], "100");
    assert_eq!(
        products[2]["link"],
        format!("{}/p/3", mock_server.uri()).as_str()
    );
    assert_eq!(
        products[2]["image"],
        format!("{}/img/3.jpg", mock_server.uri()).as_str()
    );
}

#[tokio::test]
async fn test_incomplete_listing_returns_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/list"))
        .respond_with(listing("2", &[product(1, true), product(2, false)]))
        .mount(&mock_server)
        .await;

    let response = app()
        .oneshot(fetch_request(
            json!({ "url": format!("{}/list", mock_server.uri()) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Failed to fetch product data"})
    );
}

#[tokio::test]
async fn test_page_without_items_returns_500() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(listing("0", &[]))
        .mount(&mock_server)
        .await;

    let response = app()
        .oneshot(fetch_request(
            json!({ "url": format!("{}/empty", mock_server.uri()) }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
