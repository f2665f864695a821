//! CoinMarketCap currency page (`/currencies/{slug}/`).
//!
//! Much of this page is styled-components output: class names such as
//! `sc-65e7f566-0` are build hashes and change whenever the site is rebuilt.
//! `data-role`/`data-test` hooks are tried first; the hashed names are the
//! fallback for the current build only.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{element_text, first_text, label_pairs, lookup, parse_price, parse_price_opt, selectors};
use crate::sources::types::FinancialSnapshot;

static NAME: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-role=\"coin-name\"]",
        "h1 span.coin-name-pc",
        "span.sc-65e7f566-0.lsTl",
    ])
});
static PRICE: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-test=\"text-cdp-price-display\"]",
        "div.priceValue span",
        "span.sc-65e7f566-0.clvjgF",
    ])
});
static CHANGE_PCT: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "div[data-role=\"el\"] p[data-change]",
        "p.change-text[data-change]",
        "p.sc-71024e3e-0[data-change]",
    ])
});
static STAT_ROW: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "[data-role=\"stats-block\"] dl > div",
        "div.coin-metrics-table dl > div",
    ])
});
static STAT_LABEL: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["dt"]));
static STAT_VALUE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["dd"]));

/// The stats cells interleave a change badge with the amount
/// (`"2.1% $1.28T"`); keep the dollar amount when there is one.
fn money_token(raw: &str) -> String {
    raw.split_whitespace()
        .find(|t| t.starts_with('$'))
        .unwrap_or(raw)
        .to_string()
}

/// Best-effort snapshot from a CoinMarketCap currency page.
pub fn extract(body: &str, slug: &str, captured_at: DateTime<Utc>) -> FinancialSnapshot {
    let doc = Html::parse_document(body);
    let root = doc.root_element();
    let mut snap = FinancialSnapshot::empty(slug, captured_at);

    snap.name = first_text(root, &NAME);
    snap.current_price = parse_price_opt(first_text(root, &PRICE).as_deref());

    // "1.52% (1d)": only the leading figure is the change; direction lives in
    // the data-change attribute, not in a sign.
    snap.change_percent = CHANGE_PCT
        .iter()
        .flat_map(|sel| doc.select(sel))
        .find_map(|el| {
            let text = element_text(el)?;
            let magnitude = parse_price(text.split_whitespace().next()?)?;
            let down = el.value().attr("data-change") == Some("down");
            Some(if down { -magnitude.abs() } else { magnitude })
        });

    let pairs = label_pairs(root, &STAT_ROW, &STAT_LABEL, &STAT_VALUE);
    snap.market_cap = lookup(&pairs, &["market cap"]).map(money_token);
    snap.volume = lookup(&pairs, &["volume"]).map(money_token);

    snap
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <h1><span data-role="coin-name" title="Bitcoin">Bitcoin</span><span data-role="coin-symbol">BTC</span></h1>
  <span data-test="text-cdp-price-display">$67,123.45</span>
  <div data-role="el"><p data-change="down" class="change-text">2.31% (1d)</p></div>
  <section data-role="stats-block"><dl>
    <div><dt>Market cap</dt><dd>1.2% $1.32T</dd></div>
    <div><dt>Volume (24h)</dt><dd>8.5% $28.4B</dd></div>
    <div><dt>Circulating supply</dt><dd>19.7M BTC</dd></div>
  </dl></section>
</body></html>"#;

    #[test]
    fn extracts_price_signed_change_and_stats() {
        let s = extract(PAGE, "bitcoin", Utc::now());
        assert_eq!(s.symbol, "bitcoin");
        assert_eq!(s.name.as_deref(), Some("Bitcoin"));
        assert_eq!(s.current_price, Some(67123.45));
        assert_eq!(s.change_percent, Some(-2.31));
        assert_eq!(s.market_cap.as_deref(), Some("$1.32T"));
        assert_eq!(s.volume.as_deref(), Some("$28.4B"));
    }

    #[test]
    fn hashed_class_fallback_still_reads_price() {
        let page = r#"<html><body>
            <span class="sc-65e7f566-0 lsTl">Ethereum</span>
            <span class="sc-65e7f566-0 clvjgF">$3,101.02</span>
            <p class="sc-71024e3e-0" data-change="up">0.87% (1d)</p>
        </body></html>"#;
        let s = extract(page, "ethereum", Utc::now());
        assert_eq!(s.name.as_deref(), Some("Ethereum"));
        assert_eq!(s.current_price, Some(3101.02));
        assert_eq!(s.change_percent, Some(0.87));
        assert!(s.market_cap.is_none());
    }

    #[test]
    fn rebuilt_front_end_degrades_to_empty_fields() {
        let s = extract(
            "<html><body><span class=\"sc-deadbeef-0\">$1.00</span></body></html>",
            "tether",
            Utc::now(),
        );
        assert!(s.name.is_none());
        assert!(s.current_price.is_none());
        assert!(s.change_percent.is_none());
    }
}
