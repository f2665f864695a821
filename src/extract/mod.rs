//! Site extractors: pure functions from a fetched page to typed records.
//!
//! Every field lookup is independent and falls back to "absent". Selectors are
//! tried in order, stable attribute hooks first, then the class names the sites
//! ship today. When a site rebuilds its front end the affected fields go empty;
//! nothing here returns an error.

pub mod crypto;
pub mod marketwatch;
pub mod news;
pub mod yahoo;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

static RE_LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(\d+\.?\d*|\.\d+)").expect("leading number regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Convert a price-like string to a number.
///
/// Every char that is not an ASCII digit, `-` or `.` is dropped, then the
/// longest leading number is taken (`"1.2.3"` → 1.2, `"164.08 - 237.23"` →
/// 164.08). Input with no leading number yields `None`, never `0`.
pub fn parse_price(raw: &str) -> Option<f64> {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '.')
        .collect();
    RE_LEADING_NUMBER
        .find(&kept)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// `parse_price` over an optional lookup result.
pub fn parse_price_opt(raw: Option<&str>) -> Option<f64> {
    raw.and_then(parse_price)
}

/// Decode entities, collapse whitespace, trim. Empty → `None`.
pub fn clean_text(s: &str) -> Option<String> {
    let decoded = html_escape::decode_html_entities(s);
    let collapsed = RE_WS.replace_all(&decoded, " ");
    let out = collapsed.trim();
    if out.is_empty() {
        None
    } else {
        Some(out.to_string())
    }
}

/// Parse a selector list, silently dropping entries that do not parse.
pub(crate) fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|s| Selector::parse(s).ok()).collect()
}

pub(crate) fn element_text(el: ElementRef<'_>) -> Option<String> {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// First non-empty text under `scope` across `sels`, in order.
pub(crate) fn first_text(scope: ElementRef<'_>, sels: &[Selector]) -> Option<String> {
    sels.iter()
        .flat_map(|sel| scope.select(sel))
        .find_map(element_text)
}

/// First non-empty attribute value under `scope` across `sels`.
pub(crate) fn first_attr(scope: ElementRef<'_>, sels: &[Selector], attr: &str) -> Option<String> {
    sels.iter()
        .flat_map(|sel| scope.select(sel))
        .find_map(|el| el.value().attr(attr).and_then(clean_text))
}

/// Attribute if present and non-empty, else the element text.
pub(crate) fn attr_or_text(el: ElementRef<'_>, attr: &str) -> Option<String> {
    el.value()
        .attr(attr)
        .and_then(clean_text)
        .or_else(|| element_text(el))
}

/// Label/value pairs from a key-statistics block.
///
/// Every element matching any of `rows` is one candidate row; its first
/// `labels` match and first `values` match become one pair. Rows missing
/// either half are skipped.
pub(crate) fn label_pairs(
    scope: ElementRef<'_>,
    rows: &[Selector],
    labels: &[Selector],
    values: &[Selector],
) -> Vec<(String, String)> {
    rows.iter()
        .flat_map(|sel| scope.select(sel))
        .filter_map(|r| {
            let l = first_text(r, labels)?;
            let v = first_text(r, values)?;
            Some((l, v))
        })
        .collect()
}

/// Value of the first pair whose label starts with any of `prefixes`
/// (case-insensitive).
pub(crate) fn lookup<'a>(pairs: &'a [(String, String)], prefixes: &[&str]) -> Option<&'a str> {
    prefixes.iter().find_map(|p| {
        pairs
            .iter()
            .find(|(l, _)| l.to_ascii_lowercase().starts_with(p))
            .map(|(_, v)| v.as_str())
    })
}

/// Split `"164.08 - 237.23"` into `(low, high)`.
pub fn split_range(raw: &str) -> (Option<f64>, Option<f64>) {
    match raw.split_once(" - ") {
        Some((lo, hi)) => (parse_price(lo), parse_price(hi)),
        None => (None, None),
    }
}

/// Resolve `href` against the page it came from.
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_coercion_strips_symbols() {
        assert_eq!(parse_price("$1,234.56"), Some(1234.56));
        assert_eq!(parse_price("-0.42"), Some(-0.42));
        assert_eq!(parse_price("+1.25"), Some(1.25));
        assert_eq!(parse_price("(0.66%)"), Some(0.66));
    }

    #[test]
    fn price_coercion_takes_leading_number() {
        assert_eq!(parse_price("1.2.3"), Some(1.2));
        assert_eq!(parse_price("164.08 - 237.23"), Some(164.08));
        assert_eq!(parse_price("1.21 (0.64%)"), Some(1.21));
        assert_eq!(parse_price(".5"), Some(0.5));
        assert_eq!(parse_price("12."), Some(12.0));
    }

    #[test]
    fn price_coercion_never_invents_zero() {
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("N/A"), None);
        assert_eq!(parse_price("—"), None);
        assert_eq!(parse_price("-"), None);
        assert_eq!(parse_price("--5"), None);
        assert_eq!(parse_price_opt(None), None);
    }

    #[test]
    fn clean_text_collapses_ws_and_entities() {
        assert_eq!(
            clean_text("  Apple&nbsp;Inc.\n\t(AAPL) "),
            Some("Apple Inc. (AAPL)".to_string())
        );
        assert_eq!(clean_text(" \n "), None);
    }

    #[test]
    fn ranges_split_into_low_high() {
        assert_eq!(split_range("164.08 - 237.23"), (Some(164.08), Some(237.23)));
        assert_eq!(split_range("N/A"), (None, None));
    }

    #[test]
    fn relative_links_are_absolutized() {
        let base = Url::parse("https://finance.yahoo.com/topic/latest-news/").unwrap();
        assert_eq!(
            absolutize(&base, "/news/fed-holds-rates.html").as_deref(),
            Some("https://finance.yahoo.com/news/fed-holds-rates.html")
        );
        assert_eq!(
            absolutize(&base, "https://www.reuters.com/markets/x").as_deref(),
            Some("https://www.reuters.com/markets/x")
        );
        assert_eq!(absolutize(&base, "  "), None);
    }

    #[test]
    fn invalid_selectors_are_dropped() {
        let sels = selectors(&["h1", "[[nope", "span.value"]);
        assert_eq!(sels.len(), 2);
    }
}
