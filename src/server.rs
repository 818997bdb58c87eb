//! HTTP endpoint for listing extraction
//!
//! `POST /fetch-products` runs the extraction pipeline on the posted URL in a
//! fresh browser session and returns the records. `GET /health` reports
//! liveness.

use crate::browser::BrowserLauncher;
use crate::config::Config;
use crate::extract::{extract_listing, ExtractedRecord, ExtractionStrategy, ListingStrategy};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Shared by every request
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    launcher: Arc<dyn BrowserLauncher>,
    strategy: Arc<dyn ExtractionStrategy>,
    shutdown: CancellationToken,
}

impl AppState {
    /// State using the selector strategy from `[extraction]`
    pub fn new(config: Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let strategy = Arc::new(ListingStrategy::from_config(&config.extraction));
        Self::with_strategy(config, launcher, strategy)
    }

    pub fn with_strategy(
        config: Config,
        launcher: Arc<dyn BrowserLauncher>,
        strategy: Arc<dyn ExtractionStrategy>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            launcher,
            strategy,
            shutdown: CancellationToken::new(),
        }
    }

    /// In-flight extractions are cancelled when `token` is
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

#[derive(Debug, Deserialize)]
struct FetchRequest {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FetchResponse {
    total_products: u64,
    products: Vec<ExtractedRecord>,
}

/// Builds the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/fetch-products", post(fetch_products))
        .with_state(state)
}

/// Serves the router on `[server] bind` until `shutdown` is cancelled
pub async fn serve(
    config: Config,
    launcher: Arc<dyn BrowserLauncher>,
    shutdown: CancellationToken,
) -> crate::Result<()> {
    let bind = config.server.bind.clone();
    let app = router(AppState::new(config, launcher).with_shutdown(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("Server is running on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn fetch_products(
    State(state): State<AppState>,
    body: Result<Json<FetchRequest>, JsonRejection>,
) -> Response {
    let url = match body {
        Ok(Json(FetchRequest { url: Some(url) })) if !url.trim().is_empty() => url,
        Ok(_) => return error_response(StatusCode::BAD_REQUEST, "URL is required"),
        Err(rejection) => {
            tracing::debug!("Rejected request body: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, "URL is required");
        }
    };

    let cancel = state.shutdown.child_token();
    let outcome = extract_listing(
        state.launcher.as_ref(),
        &state.config,
        state.strategy.as_ref(),
        &url,
        &cancel,
    )
    .await;

    match outcome {
        Ok(extraction) => Json(FetchResponse {
            total_products: extraction.expected,
            products: extraction.records,
        })
        .into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch product data from {}: {}", url, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch product data",
            )
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
