//! Comprehensive per-symbol view: fan out to the sources for an asset type,
//! join, and merge whatever came back.
//!
//! Per-source failures are values ([`SourceOutcome::Failed`]), and a source
//! task that panics or is cancelled is folded into the same shape, so the
//! merged result always has one entry per attempted source.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;

use crate::sources::types::{FinancialSnapshot, MarketWatchQuote, NewsItem, SourceOutcome};
use crate::sources::{SourceClient, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stock,
    Crypto,
}

impl AssetKind {
    /// `crypto` (any case) selects crypto; anything else, or nothing, is stock.
    pub fn from_query(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("crypto") => AssetKind::Crypto,
            _ => AssetKind::Stock,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Stock => "stock",
            AssetKind::Crypto => "crypto",
        }
    }

    /// Symbol case each site expects: tickers upper, crypto slugs lower.
    pub fn normalize_symbol(self, symbol: &str) -> String {
        match self {
            AssetKind::Stock => symbol.trim().to_uppercase(),
            AssetKind::Crypto => symbol.trim().to_lowercase(),
        }
    }

    pub fn sources(self) -> &'static [SourceKind] {
        match self {
            AssetKind::Stock => &[SourceKind::Yahoo, SourceKind::MarketWatch, SourceKind::News],
            AssetKind::Crypto => &[SourceKind::Crypto, SourceKind::News],
        }
    }
}

/// Payload of one entry in [`AggregateResult::sources`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SourceData {
    Snapshot(FinancialSnapshot),
    MarketWatch(MarketWatchQuote),
    News(Vec<NewsItem>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// One entry per attempted source, keyed by [`SourceKind::key`].
    pub sources: BTreeMap<&'static str, SourceOutcome<SourceData>>,
    /// News source items followed by headlines embedded in quote pages.
    pub news: Vec<NewsItem>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a joined source task. A task that panicked or was cancelled is
/// that source's failure; it never takes the other sources down with it.
fn settle<T>(
    joined: Result<SourceOutcome<T>, JoinError>,
    kind: SourceKind,
) -> SourceOutcome<T> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(source = kind.key(), error = %e, "source task aborted");
            counter!("scrape_failures_total", "source" => kind.key()).increment(1);
            SourceOutcome::failed(e.to_string(), kind.display_name())
        }
    }
}

#[derive(Clone)]
pub struct Aggregator {
    client: Arc<SourceClient>,
}

impl Aggregator {
    pub fn new(client: Arc<SourceClient>) -> Self {
        Self { client }
    }

    /// Query every source for `kind` concurrently and merge.
    /// `symbol` must already be in the case the sites expect.
    pub async fn comprehensive(&self, symbol: &str, kind: AssetKind) -> AggregateResult {
        counter!("aggregate_requests_total", "type" => kind.as_str()).increment(1);
        let news_limit = self.client.config().aggregate_news_limit;

        let news_task = {
            let c = Arc::clone(&self.client);
            tokio::spawn(async move { c.news(news_limit).await })
        };

        let mut sources: BTreeMap<&'static str, SourceOutcome<SourceData>> = BTreeMap::new();
        let mut embedded: Vec<NewsItem> = Vec::new();

        let news_outcome = match kind {
            AssetKind::Stock => {
                let yahoo_task = {
                    let c = Arc::clone(&self.client);
                    let s = symbol.to_string();
                    tokio::spawn(async move { c.yahoo(&s).await })
                };
                let mw_task = {
                    let c = Arc::clone(&self.client);
                    let s = symbol.to_string();
                    tokio::spawn(async move { c.marketwatch(&s).await })
                };
                let (yahoo, mw, news) = tokio::join!(yahoo_task, mw_task, news_task);
                let yahoo = settle(yahoo, SourceKind::Yahoo);
                let mw = settle(mw, SourceKind::MarketWatch);

                if let SourceOutcome::Ok(q) = &mw {
                    embedded.extend(q.news.iter().cloned());
                }
                sources.insert(SourceKind::Yahoo.key(), yahoo.map(SourceData::Snapshot));
                sources.insert(SourceKind::MarketWatch.key(), mw.map(SourceData::MarketWatch));
                news
            }
            AssetKind::Crypto => {
                let crypto_task = {
                    let c = Arc::clone(&self.client);
                    let s = symbol.to_string();
                    tokio::spawn(async move { c.crypto(&s).await })
                };
                let (crypto, news) = tokio::join!(crypto_task, news_task);
                let crypto = settle(crypto, SourceKind::Crypto);
                sources.insert(SourceKind::Crypto.key(), crypto.map(SourceData::Snapshot));
                news
            }
        };

        let news_outcome = settle(news_outcome, SourceKind::News);
        let mut news = news_outcome.as_ref().ok().cloned().unwrap_or_default();
        news.extend(embedded);
        sources.insert(SourceKind::News.key(), news_outcome.map(SourceData::News));

        let failed: Vec<&str> = sources
            .iter()
            .filter(|(_, o)| !o.is_ok())
            .map(|(k, _)| *k)
            .collect();
        tracing::info!(
            %symbol,
            kind = kind.as_str(),
            attempted = sources.len(),
            failed = ?failed,
            news = news.len(),
            "aggregate assembled"
        );

        AggregateResult {
            symbol: symbol.to_string(),
            kind,
            sources,
            news,
            timestamp: Utc::now(),
        }
    }
}
