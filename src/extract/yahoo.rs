//! Yahoo Finance quote page (`/quote/{SYMBOL}`).

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{
    attr_or_text, first_text, label_pairs, lookup, parse_price, parse_price_opt, selectors,
    split_range,
};
use crate::sources::types::FinancialSnapshot;

static NAME: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-testid=\"quote-title\"] h1",
        "section.container h1",
        "h1.D\\(ib\\)",
        "h1",
    ])
});
static PRICE: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-testid=\"qsp-price\"]",
        "fin-streamer[data-field=\"regularMarketPrice\"]",
    ])
});
static CHANGE: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-testid=\"qsp-price-change\"]",
        "fin-streamer[data-field=\"regularMarketChange\"]",
    ])
});
static CHANGE_PCT: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-testid=\"qsp-price-change-percent\"]",
        "fin-streamer[data-field=\"regularMarketChangePercent\"]",
    ])
});
static STAT_ROW: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-testid=\"quote-statistics\"] li",
        "#quote-summary tr",
    ])
});
static STAT_LABEL: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["span.label", "td:first-child"]));
static STAT_VALUE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["span.value", "td:last-child"]));

// Older markup carried one data-test hook per statistic cell.
fn legacy_cell(doc: &Html, key: &str) -> Option<String> {
    let sels = selectors(&[format!("td[data-test=\"{key}-value\"]").as_str()]);
    first_text(doc.root_element(), &sels)
}

/// Quote fields scoped to this symbol's streamers first, since the page also
/// streams prices for unrelated tickers (trending lists, comparisons).
fn streamer_value(doc: &Html, symbol: &str, field: &str, fallback: &[Selector]) -> Option<f64> {
    let scoped = selectors(&[format!(
        "fin-streamer[data-field=\"{field}\"][data-symbol=\"{symbol}\"]"
    )
    .as_str()]);
    scoped
        .iter()
        .chain(fallback.iter())
        .flat_map(|sel| doc.select(sel))
        .find_map(|el| attr_or_text(el, "data-value").as_deref().and_then(parse_price))
}

/// Best-effort snapshot from a Yahoo Finance quote page.
pub fn extract(body: &str, symbol: &str, captured_at: DateTime<Utc>) -> FinancialSnapshot {
    let doc = Html::parse_document(body);
    let root = doc.root_element();
    let mut snap = FinancialSnapshot::empty(symbol, captured_at);

    snap.name = first_text(root, &NAME);
    snap.current_price = streamer_value(&doc, symbol, "regularMarketPrice", &PRICE);
    snap.change = streamer_value(&doc, symbol, "regularMarketChange", &CHANGE);
    snap.change_percent = streamer_value(&doc, symbol, "regularMarketChangePercent", &CHANGE_PCT);

    let pairs = label_pairs(root, &STAT_ROW, &STAT_LABEL, &STAT_VALUE);

    snap.market_cap = lookup(&pairs, &["market cap"])
        .map(str::to_string)
        .or_else(|| legacy_cell(&doc, "MARKET_CAP"));
    snap.volume = lookup(&pairs, &["volume"])
        .map(str::to_string)
        .or_else(|| legacy_cell(&doc, "TD_VOLUME"));
    snap.pe_ratio = parse_price_opt(lookup(&pairs, &["pe ratio"]))
        .or_else(|| parse_price_opt(legacy_cell(&doc, "PE_RATIO").as_deref()));
    snap.eps = parse_price_opt(lookup(&pairs, &["eps"]))
        .or_else(|| parse_price_opt(legacy_cell(&doc, "EPS_RATIO").as_deref()));
    snap.dividend = lookup(&pairs, &["forward dividend", "dividend"])
        .map(str::to_string)
        .or_else(|| legacy_cell(&doc, "DIVIDEND_AND_YIELD"));

    let range = lookup(&pairs, &["52 week range"])
        .map(str::to_string)
        .or_else(|| legacy_cell(&doc, "FIFTY_TWO_WK_RANGE"));
    if let Some(r) = range {
        let (lo, hi) = split_range(&r);
        snap.fifty_two_week_low = lo;
        snap.fifty_two_week_high = hi;
    }

    snap
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <section class="container"><div data-testid="quote-title"><h1>Apple Inc. (AAPL)</h1></div></section>
  <fin-streamer data-symbol="^GSPC" data-field="regularMarketPrice" data-value="5,100.10">5,100.10</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketPrice" data-value="189.84">189.84</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketChange" data-value="-1.23">-1.23</fin-streamer>
  <fin-streamer data-symbol="AAPL" data-field="regularMarketChangePercent" data-value="-0.64">(-0.64%)</fin-streamer>
  <div data-testid="quote-statistics"><ul>
    <li><span class="label">Market Cap (intraday)</span><span class="value">2.91T</span></li>
    <li><span class="label">Volume</span><span class="value">45,210,300</span></li>
    <li><span class="label">Avg. Volume</span><span class="value">58,000,000</span></li>
    <li><span class="label">PE Ratio (TTM)</span><span class="value">29.53</span></li>
    <li><span class="label">EPS (TTM)</span><span class="value">6.43</span></li>
    <li><span class="label">Forward Dividend &amp; Yield</span><span class="value">0.96 (0.51%)</span></li>
    <li><span class="label">52 Week Range</span><span class="value">164.08 - 199.62</span></li>
  </ul></div>
</body></html>"#;

    #[test]
    fn extracts_scoped_quote_and_statistics() {
        let s = extract(PAGE, "AAPL", Utc::now());
        assert_eq!(s.name.as_deref(), Some("Apple Inc. (AAPL)"));
        assert_eq!(s.current_price, Some(189.84));
        assert_eq!(s.change, Some(-1.23));
        assert_eq!(s.change_percent, Some(-0.64));
        assert_eq!(s.market_cap.as_deref(), Some("2.91T"));
        assert_eq!(s.volume.as_deref(), Some("45,210,300"));
        assert_eq!(s.pe_ratio, Some(29.53));
        assert_eq!(s.eps, Some(6.43));
        assert_eq!(s.dividend.as_deref(), Some("0.96 (0.51%)"));
        assert_eq!(s.fifty_two_week_low, Some(164.08));
        assert_eq!(s.fifty_two_week_high, Some(199.62));
    }

    #[test]
    fn legacy_data_test_cells_still_work() {
        let page = r#"<html><body><h1>Tesla, Inc. (TSLA)</h1>
            <table><tr><td>Market Cap</td><td data-test="MARKET_CAP-value">560.1B</td></tr>
            <tr><td>PE</td><td data-test="PE_RATIO-value">41.2</td></tr></table></body></html>"#;
        let s = extract(page, "TSLA", Utc::now());
        assert_eq!(s.name.as_deref(), Some("Tesla, Inc. (TSLA)"));
        assert_eq!(s.market_cap.as_deref(), Some("560.1B"));
        assert_eq!(s.pe_ratio, Some(41.2));
        assert_eq!(s.current_price, None);
    }

    #[test]
    fn malformed_document_yields_mostly_empty_record() {
        let s = extract("<div><span>not a quote page", "MSFT", Utc::now());
        assert_eq!(s.symbol, "MSFT");
        assert!(s.name.is_none());
        assert!(s.current_price.is_none());
        assert!(s.market_cap.is_none());
        assert!(s.fifty_two_week_high.is_none());
    }
}
