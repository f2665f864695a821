// src/config/scrape.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf, time::Duration};

pub const ENV_CONFIG_PATH: &str = "SCRAPE_CONFIG_PATH";
pub const ENV_TIMEOUT_SECS: &str = "SCRAPE_TIMEOUT_SECS";
pub const ENV_USER_AGENT: &str = "SCRAPE_USER_AGENT";
pub const DEFAULT_CONFIG_PATH: &str = "config/scrape.toml";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_news_limit() -> usize {
    10
}
fn default_aggregate_news_limit() -> usize {
    5
}
fn default_yahoo_base() -> String {
    "https://finance.yahoo.com/quote".to_string()
}
fn default_marketwatch_base() -> String {
    "https://www.marketwatch.com/investing/stock".to_string()
}
fn default_crypto_base() -> String {
    "https://coinmarketcap.com/currencies".to_string()
}
fn default_news_url() -> String {
    "https://finance.yahoo.com/topic/latest-news/".to_string()
}

/// Where and how the scraped sites are reached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Per-request timeout; 0 is replaced by the default.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// `limit` used by `/source/news` when the query has none.
    #[serde(default = "default_news_limit")]
    pub default_news_limit: usize,
    /// News items pulled into every comprehensive result.
    #[serde(default = "default_aggregate_news_limit")]
    pub aggregate_news_limit: usize,
    #[serde(default = "default_yahoo_base")]
    pub yahoo_base: String,
    #[serde(default = "default_marketwatch_base")]
    pub marketwatch_base: String,
    #[serde(default = "default_crypto_base")]
    pub crypto_base: String,
    #[serde(default = "default_news_url")]
    pub news_url: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            default_news_limit: default_news_limit(),
            aggregate_news_limit: default_aggregate_news_limit(),
            yahoo_base: default_yahoo_base(),
            marketwatch_base: default_marketwatch_base(),
            crypto_base: default_crypto_base(),
            news_url: default_news_url(),
        }
    }
}

impl ScrapeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ScrapeConfig = toml::from_str(s).context("parsing scrape config toml")?;
        Ok(cfg.sanitized())
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading scrape config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $SCRAPE_CONFIG_PATH (must exist)
    /// 2) config/scrape.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        Ok(base.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(secs) = env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.timeout_secs = secs;
        }
        if let Ok(ua) = env::var(ENV_USER_AGENT) {
            if !ua.trim().is_empty() {
                self.user_agent = ua.trim().to_string();
            }
        }
        self.sanitized()
    }

    fn sanitized(mut self) -> Self {
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout_secs();
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = ScrapeConfig::from_toml_str(
            r#"
timeout_secs = 3
news_url = "http://localhost:9000/news"
"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_secs, 3);
        assert_eq!(cfg.news_url, "http://localhost:9000/news");
        assert_eq!(cfg.aggregate_news_limit, 5);
        assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn zero_timeout_falls_back_to_ten_seconds() {
        let cfg = ScrapeConfig::from_toml_str("timeout_secs = 0").unwrap();
        assert_eq!(cfg.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(ScrapeConfig::from_toml_str("timeout_secs = \"soon\"").is_err());
    }
}
