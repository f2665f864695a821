// src/sources/types.rs
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// One point-in-time record for one symbol from one source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    // display text as shown on the page, e.g. "2.87T"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_low: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl FinancialSnapshot {
    /// Empty record for `symbol`; extractors fill what they find.
    pub fn empty(symbol: &str, captured_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: None,
            current_price: None,
            change: None,
            change_percent: None,
            market_cap: None,
            volume: None,
            pe_ratio: None,
            eps: None,
            dividend: None,
            fifty_two_week_high: None,
            fifty_two_week_low: None,
            timestamp: captured_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Always absolute.
    pub link: String,
    /// Page-provided time label, or capture time when the page has none.
    pub timestamp: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalystRatings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_ratings: Option<u32>,
}

impl AnalystRatings {
    pub fn is_empty(&self) -> bool {
        self.recommendation.is_none()
            && self.target_price.is_none()
            && self.number_of_ratings.is_none()
    }
}

/// MarketWatch quote page: snapshot plus the headlines and analyst block it embeds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarketWatchQuote {
    #[serde(flatten)]
    pub snapshot: FinancialSnapshot,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyst_ratings: Option<AnalystRatings>,
}

/// Why a single source produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub error: String,
    /// Display name, e.g. "Yahoo Finance".
    pub source: String,
}

/// Per-source result. Serializes as `{success: true, data}` or
/// `{success: false, error, source}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Ok(T),
    Failed(SourceFailure),
}

impl<T> SourceOutcome<T> {
    pub fn failed(error: impl Into<String>, source: impl Into<String>) -> Self {
        SourceOutcome::Failed(SourceFailure {
            error: error.into(),
            source: source.into(),
        })
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SourceOutcome::Ok(_))
    }

    pub fn ok(self) -> Option<T> {
        match self {
            SourceOutcome::Ok(v) => Some(v),
            SourceOutcome::Failed(_) => None,
        }
    }

    pub fn failure(self) -> Option<SourceFailure> {
        match self {
            SourceOutcome::Ok(_) => None,
            SourceOutcome::Failed(f) => Some(f),
        }
    }

    pub fn as_ref(&self) -> SourceOutcome<&T> {
        match self {
            SourceOutcome::Ok(v) => SourceOutcome::Ok(v),
            SourceOutcome::Failed(f) => SourceOutcome::Failed(f.clone()),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> SourceOutcome<U> {
        match self {
            SourceOutcome::Ok(v) => SourceOutcome::Ok(f(v)),
            SourceOutcome::Failed(e) => SourceOutcome::Failed(e),
        }
    }
}

impl<T: Serialize> Serialize for SourceOutcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SourceOutcome::Ok(data) => {
                let mut st = serializer.serialize_struct("SourceOutcome", 2)?;
                st.serialize_field("success", &true)?;
                st.serialize_field("data", data)?;
                st.end()
            }
            SourceOutcome::Failed(f) => {
                let mut st = serializer.serialize_struct("SourceOutcome", 3)?;
                st.serialize_field("success", &false)?;
                st.serialize_field("error", &f.error)?;
                st.serialize_field("source", &f.source)?;
                st.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_fields_are_omitted_not_null() {
        let ts = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut snap = FinancialSnapshot::empty("AAPL", ts);
        snap.current_price = Some(189.5);
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["symbol"], "AAPL");
        assert_eq!(v["currentPrice"], 189.5);
        assert!(v.get("marketCap").is_none());
        assert!(v.get("peRatio").is_none());
        assert_eq!(v["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn outcome_envelopes() {
        let ok: SourceOutcome<u32> = SourceOutcome::Ok(7);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "data": 7})
        );

        let bad: SourceOutcome<u32> = SourceOutcome::failed("HTTP 503", "MarketWatch");
        assert_eq!(
            serde_json::to_value(&bad).unwrap(),
            json!({"success": false, "error": "HTTP 503", "source": "MarketWatch"})
        );
        assert!(!bad.is_ok());
    }

    #[test]
    fn marketwatch_quote_flattens_snapshot() {
        let ts = Utc::now();
        let q = MarketWatchQuote {
            snapshot: FinancialSnapshot::empty("MSFT", ts),
            news: vec![],
            analyst_ratings: None,
        };
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(v["symbol"], "MSFT");
        assert!(v["news"].as_array().unwrap().is_empty());
        assert!(v.get("analystRatings").is_none());
    }
}
