use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::aggregate::{AggregateResult, Aggregator, AssetKind};
use crate::config::ScrapeConfig;
use crate::sources::fetch::{HttpFetcher, PageFetcher};
use crate::sources::types::{FinancialSnapshot, MarketWatchQuote, NewsItem, SourceOutcome};
use crate::sources::{SourceClient, SourceKind};

#[derive(Clone)]
pub struct AppState {
    client: Arc<SourceClient>,
    aggregator: Aggregator,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cfg: ScrapeConfig) -> Self {
        let client = Arc::new(SourceClient::new(fetcher, Arc::new(cfg)));
        Self {
            aggregator: Aggregator::new(Arc::clone(&client)),
            client,
        }
    }

    /// Production state: reqwest fetcher built from `cfg`.
    pub fn from_config(cfg: ScrapeConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::from_config(&cfg)?;
        Ok(Self::new(Arc::new(fetcher), cfg))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/source/health", get(source_health))
        .route("/source/yahoo", get(missing_symbol))
        .route("/source/yahoo/", get(missing_symbol))
        .route("/source/yahoo/{symbol}", get(yahoo))
        .route("/source/marketwatch", get(missing_symbol))
        .route("/source/marketwatch/", get(missing_symbol))
        .route("/source/marketwatch/{symbol}", get(marketwatch))
        .route("/source/crypto", get(missing_symbol))
        .route("/source/crypto/", get(missing_symbol))
        .route("/source/crypto/{symbol}", get(crypto))
        .route("/source/news", get(news))
        .route("/source/comprehensive", get(missing_symbol))
        .route("/source/comprehensive/", get(missing_symbol))
        .route("/source/comprehensive/{symbol}", get(comprehensive))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Alias so callers can use `crate_root::router(state)`.
pub fn router(state: AppState) -> Router {
    create_router(state)
}

// ---- envelope + errors ----

/// Uniform response body for every `/source/*` route.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> Envelope<T> {
    fn ok(data: T, source: Option<&str>) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            source: source.map(str::to_string),
            message: None,
            error: None,
            timestamp: Utc::now(),
        })
    }
}

fn failure_body(message: String, error: String, source: Option<String>) -> Envelope<()> {
    Envelope {
        success: false,
        data: None,
        source,
        message: Some(message),
        error: Some(error),
        timestamp: Utc::now(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Caller mistake; answered before any network call.
    #[error("{0} parameter is required")]
    MissingParam(&'static str),
    /// A single-source route whose source failed.
    #[error("Failed to fetch data from {source_name}")]
    Upstream { source_name: String, error: String },
    /// Anything unexpected, including a panicking handler.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            ApiError::MissingParam(_) => (
                StatusCode::BAD_REQUEST,
                failure_body(message.clone(), message, None),
            ),
            ApiError::Upstream { source_name, error } => (
                StatusCode::BAD_GATEWAY,
                failure_body(message, error, Some(source_name)),
            ),
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    failure_body(message, e.to_string(), None),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

fn require_symbol(raw: &str) -> Result<&str, ApiError> {
    let s = raw.trim();
    if s.is_empty() {
        Err(ApiError::MissingParam("Symbol"))
    } else {
        Ok(s)
    }
}

fn single<T>(outcome: SourceOutcome<T>) -> Result<T, ApiError> {
    match outcome {
        SourceOutcome::Ok(v) => Ok(v),
        SourceOutcome::Failed(f) => Err(ApiError::Upstream {
            source_name: f.source,
            error: f.error,
        }),
    }
}

// ---- handlers ----

async fn missing_symbol() -> ApiError {
    ApiError::MissingParam("Symbol")
}

async fn yahoo(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Envelope<FinancialSnapshot>>, ApiError> {
    let symbol = require_symbol(&symbol)?.to_uppercase();
    let snap = single(state.client.yahoo(&symbol).await)?;
    Ok(Envelope::ok(snap, Some(SourceKind::Yahoo.display_name())))
}

async fn marketwatch(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Envelope<MarketWatchQuote>>, ApiError> {
    let symbol = require_symbol(&symbol)?.to_uppercase();
    let quote = single(state.client.marketwatch(&symbol).await)?;
    Ok(Envelope::ok(quote, Some(SourceKind::MarketWatch.display_name())))
}

async fn crypto(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Envelope<FinancialSnapshot>>, ApiError> {
    let slug = require_symbol(&symbol)?.to_lowercase();
    let snap = single(state.client.crypto(&slug).await)?;
    Ok(Envelope::ok(snap, Some(SourceKind::Crypto.display_name())))
}

#[derive(Debug, Deserialize)]
struct NewsQuery {
    // kept as text so a non-numeric limit falls back instead of rejecting
    limit: Option<String>,
}

/// Integer `limit`, no upper bound. Missing or unparseable → `default`.
fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

async fn news(
    State(state): State<AppState>,
    Query(q): Query<NewsQuery>,
) -> Result<Json<Envelope<Vec<NewsItem>>>, ApiError> {
    let limit = parse_limit(q.limit.as_deref(), state.client.config().default_news_limit);
    let items = single(state.client.news(limit).await)?;
    Ok(Envelope::ok(items, Some(SourceKind::News.display_name())))
}

#[derive(Debug, Deserialize)]
struct ComprehensiveQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

async fn comprehensive(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(q): Query<ComprehensiveQuery>,
) -> Result<Json<Envelope<AggregateResult>>, ApiError> {
    let raw = require_symbol(&symbol)?;
    let kind = AssetKind::from_query(q.kind.as_deref());
    let symbol = kind.normalize_symbol(raw);
    let result = state.aggregator.comprehensive(&symbol, kind).await;
    Ok(Envelope::ok(result, None))
}

#[derive(Debug, Serialize)]
struct EndpointInfo {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct Capabilities {
    service: &'static str,
    status: &'static str,
    sources: Vec<&'static str>,
    endpoints: Vec<EndpointInfo>,
}

fn capabilities() -> Capabilities {
    let ep = |path, description| EndpointInfo {
        method: "GET",
        path,
        description,
    };
    Capabilities {
        service: "inverstra-data-service",
        status: "running",
        sources: SourceKind::ALL.iter().map(|k| k.display_name()).collect(),
        endpoints: vec![
            ep("/source/yahoo/{symbol}", "Yahoo Finance quote snapshot"),
            ep(
                "/source/marketwatch/{symbol}",
                "MarketWatch quote with headlines and analyst ratings",
            ),
            ep("/source/crypto/{symbol}", "CoinMarketCap quote by slug"),
            ep("/source/news?limit=N", "Latest financial headlines"),
            ep(
                "/source/comprehensive/{symbol}?type=stock|crypto",
                "All sources for a symbol, partial failures reported inline",
            ),
            ep("/source/health", "This listing"),
        ],
    }
}

/// Static; touches no external dependency.
async fn source_health() -> Json<Envelope<Capabilities>> {
    let mut env = Envelope::ok(capabilities(), None);
    env.message = Some("Financial data service is running".to_string());
    env
}
