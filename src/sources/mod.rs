//! Source clients: one fetch + one extractor per financial site.
//!
//! [`SourceClient`] builds the page URL for a source, fetches it through a
//! [`PageFetcher`], and hands the body to the matching extractor. Any fetch
//! failure becomes a [`SourceOutcome::Failed`] carrying the error message and
//! the source's display name; nothing escapes this layer as an `Err`.

pub mod fetch;
pub mod types;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use url::Url;

use crate::config::ScrapeConfig;
use crate::extract;
use fetch::{FetchError, PageFetcher};
use types::{FinancialSnapshot, MarketWatchQuote, NewsItem, SourceOutcome};

/// The scraped sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Yahoo,
    MarketWatch,
    Crypto,
    News,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Yahoo,
        SourceKind::MarketWatch,
        SourceKind::Crypto,
        SourceKind::News,
    ];

    /// Key used in aggregate `sources` maps and metric labels.
    pub fn key(self) -> &'static str {
        match self {
            SourceKind::Yahoo => "yahoo",
            SourceKind::MarketWatch => "marketwatch",
            SourceKind::Crypto => "crypto",
            SourceKind::News => "news",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            SourceKind::Yahoo => "Yahoo Finance",
            SourceKind::MarketWatch => "MarketWatch",
            SourceKind::Crypto => "CoinMarketCap",
            SourceKind::News => "Yahoo Finance News",
        }
    }

    /// Page URL for `symbol`. The symbol is used as given; case conventions
    /// belong to the caller.
    pub fn url(self, cfg: &ScrapeConfig, symbol: &str) -> String {
        match self {
            SourceKind::Yahoo => format!("{}/{}", cfg.yahoo_base.trim_end_matches('/'), symbol),
            SourceKind::MarketWatch => {
                format!("{}/{}", cfg.marketwatch_base.trim_end_matches('/'), symbol)
            }
            SourceKind::Crypto => {
                format!("{}/{}/", cfg.crypto_base.trim_end_matches('/'), symbol)
            }
            SourceKind::News => cfg.news_url.clone(),
        }
    }
}

/// Stateless per call; cheap to share behind an `Arc`.
pub struct SourceClient {
    fetcher: Arc<dyn PageFetcher>,
    cfg: Arc<ScrapeConfig>,
}

impl SourceClient {
    pub fn new(fetcher: Arc<dyn PageFetcher>, cfg: Arc<ScrapeConfig>) -> Self {
        Self { fetcher, cfg }
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.cfg
    }

    async fn fetch_page(&self, kind: SourceKind, url: &str) -> Result<(String, Url), FetchError> {
        let page_url = Url::parse(url).map_err(|e| FetchError::Url {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let source = kind.key();
        counter!("scrape_requests_total", "source" => source).increment(1);
        let t0 = Instant::now();
        let res = self.fetcher.get_html(url).await;
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("scrape_fetch_ms", "source" => source).record(ms);

        match res {
            Ok(body) => {
                tracing::info!(source, %url, bytes = body.len(), elapsed_ms = ms, "fetched page");
                Ok((body, page_url))
            }
            Err(e) => {
                tracing::warn!(source, %url, error = %e, elapsed_ms = ms, "source fetch failed");
                counter!("scrape_failures_total", "source" => source).increment(1);
                Err(e)
            }
        }
    }

    async fn run<T>(
        &self,
        kind: SourceKind,
        symbol: &str,
        parse: impl FnOnce(&str, &Url) -> T,
    ) -> SourceOutcome<T> {
        let url = kind.url(&self.cfg, symbol);
        match self.fetch_page(kind, &url).await {
            Ok((body, page_url)) => SourceOutcome::Ok(parse(&body, &page_url)),
            Err(e) => SourceOutcome::failed(e.to_string(), kind.display_name()),
        }
    }

    /// Yahoo Finance quote. Expects an uppercase ticker.
    pub async fn yahoo(&self, symbol: &str) -> SourceOutcome<FinancialSnapshot> {
        self.run(SourceKind::Yahoo, symbol, |body, _| {
            extract::yahoo::extract(body, symbol, Utc::now())
        })
        .await
    }

    /// MarketWatch quote with embedded headlines and analyst ratings.
    pub async fn marketwatch(&self, symbol: &str) -> SourceOutcome<MarketWatchQuote> {
        self.run(SourceKind::MarketWatch, symbol, |body, page_url| {
            extract::marketwatch::extract(body, symbol, page_url, Utc::now())
        })
        .await
    }

    /// CoinMarketCap quote. Expects a lowercase slug such as `bitcoin`.
    pub async fn crypto(&self, slug: &str) -> SourceOutcome<FinancialSnapshot> {
        self.run(SourceKind::Crypto, slug, |body, _| {
            extract::crypto::extract(body, slug, Utc::now())
        })
        .await
    }

    /// At most `limit` headlines from the news listing.
    pub async fn news(&self, limit: usize) -> SourceOutcome<Vec<NewsItem>> {
        self.run(SourceKind::News, "", |body, page_url| {
            extract::news::extract(body, page_url, limit, Utc::now())
        })
        .await
    }
}
