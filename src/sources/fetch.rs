// src/sources/fetch.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::config::ScrapeConfig;

/// Upstream failure for one page fetch. Always caught at the source layer.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("reading response body failed: {0}")]
    Body(String),
    #[error("invalid url {url}: {reason}")]
    Url { url: String, reason: String },
}

/// Retrieves the HTML of one page. The HTTP implementation is [`HttpFetcher`];
/// tests plug in fixture fetchers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get_html(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher with browser-like headers and a per-request timeout.
/// No retries and no caching: every call goes to the origin.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

fn browser_headers() -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    h.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    h
}

impl HttpFetcher {
    pub fn from_config(cfg: &ScrapeConfig) -> Result<Self> {
        let timeout = cfg.timeout();
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(browser_headers())
            .timeout(timeout)
            .build()
            .context("building scrape http client")?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn get_html(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Body(e.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_readable() {
        let e = FetchError::Status {
            status: 503,
            url: "https://example.com/q".into(),
        };
        assert_eq!(
            e.to_string(),
            "upstream returned HTTP 503 for https://example.com/q"
        );
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(10)).to_string(),
            "request timed out after 10s"
        );
    }

    #[test]
    fn client_builds_from_defaults() {
        assert!(HttpFetcher::from_config(&ScrapeConfig::default()).is_ok());
    }
}
