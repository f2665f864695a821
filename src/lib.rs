// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod extract;
pub mod metrics;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::{AggregateResult, Aggregator, AssetKind};
pub use crate::api::{router, AppState};
pub use crate::config::ScrapeConfig;
pub use crate::sources::types::{FinancialSnapshot, NewsItem, SourceOutcome};
pub use crate::sources::{SourceClient, SourceKind};

use axum::Router;
use tracing::info;

/// Build the production router: config from disk/env, reqwest fetcher.
/// `/metrics` is not included; the binary merges it once the recorder exists.
pub fn app() -> anyhow::Result<Router> {
    let cfg = ScrapeConfig::load_default()?;
    info!(
        timeout_secs = cfg.timeout_secs,
        yahoo = %cfg.yahoo_base,
        marketwatch = %cfg.marketwatch_base,
        crypto = %cfg.crypto_base,
        news = %cfg.news_url,
        "scrape config loaded"
    );
    let state = AppState::from_config(cfg)?;
    Ok(api::create_router(state))
}
