//! MarketWatch quote page (`/investing/stock/{symbol}`).
//!
//! Besides the quote itself, the page embeds recent headlines and an analyst
//! summary table; both are picked up here.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{
    absolutize, attr_or_text, element_text, first_attr, first_text, label_pairs, lookup, parse_price,
    parse_price_opt, selectors, split_range,
};
use crate::sources::types::{AnalystRatings, FinancialSnapshot, MarketWatchQuote, NewsItem};

pub const SOURCE_LABEL: &str = "MarketWatch";

static META_NAME: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["meta[name=\"name\"]"]));
static META_PRICE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["meta[name=\"price\"]"]));
static META_CHANGE: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["meta[name=\"priceChange\"]"]));
static META_CHANGE_PCT: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["meta[name=\"priceChangePercent\"]"]));

static NAME: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["h1.company__name"]));
static PRICE: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "h2.intraday__price bg-quote",
        "h2.intraday__price span.value",
    ])
});
static CHANGE: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "bg-quote.intraday__change span.change--point--q",
        "span.change--point--q",
    ])
});
static CHANGE_PCT: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "bg-quote.intraday__change span.change--percent--q",
        "span.change--percent--q",
    ])
});
static VOLUME: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["div.range__header span.primary", "mw-rangebar.element--range span.primary"]));

static KV_ROW: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["li.kv__item"]));
static KV_LABEL: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["small.label"]));
static KV_VALUE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["span.primary"]));

static ARTICLE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["div.article__content"]));
static ARTICLE_LINK: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["h3.article__headline a[href]", "a.link[href]"]));
static ARTICLE_SUMMARY: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["p.article__summary"]));
static ARTICLE_TIME: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["span.article__timestamp"]));
static ARTICLE_PROVIDER: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["span.article__provider"]));

static ANALYST_ROW: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["div.element--analyst table.value-pairs tr"]));
static ANALYST_LABEL: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["td:first-child"]));
static ANALYST_VALUE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["td:last-child"]));
static ANALYST_ACTIVE: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["div.element--analyst li.analyst__option.active"]));

/// Best-effort quote, headlines and analyst summary from a MarketWatch page.
pub fn extract(
    body: &str,
    symbol: &str,
    page_url: &Url,
    captured_at: DateTime<Utc>,
) -> MarketWatchQuote {
    let doc = Html::parse_document(body);
    let root = doc.root_element();
    let mut snap = FinancialSnapshot::empty(symbol, captured_at);

    snap.name = first_attr(root, &META_NAME, "content").or_else(|| first_text(root, &NAME));
    snap.current_price = first_attr(root, &META_PRICE, "content")
        .as_deref()
        .and_then(parse_price)
        .or_else(|| parse_price_opt(first_text(root, &PRICE).as_deref()));
    snap.change = first_attr(root, &META_CHANGE, "content")
        .as_deref()
        .and_then(parse_price)
        .or_else(|| parse_price_opt(first_text(root, &CHANGE).as_deref()));
    snap.change_percent = first_attr(root, &META_CHANGE_PCT, "content")
        .as_deref()
        .and_then(parse_price)
        .or_else(|| parse_price_opt(first_text(root, &CHANGE_PCT).as_deref()));

    let pairs = label_pairs(root, &KV_ROW, &KV_LABEL, &KV_VALUE);
    snap.market_cap = lookup(&pairs, &["market cap"]).map(str::to_string);
    snap.volume = first_text(root, &VOLUME)
        .or_else(|| lookup(&pairs, &["volume", "average volume"]).map(str::to_string));
    snap.pe_ratio = parse_price_opt(lookup(&pairs, &["p/e ratio"]));
    snap.eps = parse_price_opt(lookup(&pairs, &["eps"]));
    snap.dividend = lookup(&pairs, &["dividend", "yield"]).map(str::to_string);
    if let Some(r) = lookup(&pairs, &["52 week range"]) {
        let (lo, hi) = split_range(r);
        snap.fifty_two_week_low = lo;
        snap.fifty_two_week_high = hi;
    }

    let news = ARTICLE
        .iter()
        .flat_map(|sel| root.select(sel))
        .filter_map(|a| article(a, page_url, captured_at))
        .collect();

    MarketWatchQuote {
        snapshot: snap,
        news,
        analyst_ratings: analyst_ratings(root),
    }
}

fn article(el: ElementRef<'_>, page_url: &Url, captured_at: DateTime<Utc>) -> Option<NewsItem> {
    let link_el = ARTICLE_LINK.iter().find_map(|s| el.select(s).next())?;
    let title = element_text(link_el)?;
    let link = link_el
        .value()
        .attr("href")
        .and_then(|h| absolutize(page_url, h))?;
    let timestamp = ARTICLE_TIME
        .iter()
        .find_map(|s| el.select(s).next())
        .and_then(|t| attr_or_text(t, "data-est"))
        .unwrap_or_else(|| captured_at.to_rfc3339());

    Some(NewsItem {
        title,
        summary: first_text(el, &ARTICLE_SUMMARY).unwrap_or_default(),
        link,
        timestamp,
        source: first_text(el, &ARTICLE_PROVIDER).unwrap_or_else(|| SOURCE_LABEL.to_string()),
    })
}

fn analyst_ratings(root: ElementRef<'_>) -> Option<AnalystRatings> {
    let pairs = label_pairs(root, &ANALYST_ROW, &ANALYST_LABEL, &ANALYST_VALUE);
    let ratings = AnalystRatings {
        recommendation: lookup(&pairs, &["average recommendation"])
            .map(str::to_string)
            .or_else(|| first_text(root, &ANALYST_ACTIVE)),
        target_price: parse_price_opt(lookup(&pairs, &["average target price"])),
        number_of_ratings: lookup(&pairs, &["number of ratings"])
            .and_then(|v| v.trim().parse::<u32>().ok()),
    };
    (!ratings.is_empty()).then_some(ratings)
}
