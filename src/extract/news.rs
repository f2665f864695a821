//! Yahoo Finance latest-news listing.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{absolutize, clean_text, first_text, selectors};
use crate::sources::types::NewsItem;

pub const SOURCE_LABEL: &str = "Yahoo Finance";

static ITEM: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[
        "li.stream-item",
        "section[data-testid=\"storyitem\"]",
        "li.js-stream-content",
    ])
});
static TITLE: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["h3"]));
static LINK: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["a.subtle-link[href]", "h3 a[href]", "a[href]"]));
static SUMMARY: Lazy<Vec<Selector>> = Lazy::new(|| selectors(&["p"]));
static PUBLISHING: Lazy<Vec<Selector>> =
    Lazy::new(|| selectors(&["div.publishing", "div.footer div.publishing"]));

/// Split `"Reuters • 2 hours ago"` into provider and time label.
fn split_publishing(raw: &str) -> (Option<String>, Option<String>) {
    match raw.split_once('•') {
        Some((who, when)) => (clean_text(who), clean_text(when)),
        None => (None, clean_text(raw)),
    }
}

fn item(el: ElementRef<'_>, page_url: &Url, captured_at: DateTime<Utc>) -> Option<NewsItem> {
    let title = first_text(el, &TITLE)?;
    let link = LINK
        .iter()
        .flat_map(|s| el.select(s))
        .find_map(|a| a.value().attr("href").and_then(|h| absolutize(page_url, h)))?;
    let (provider, when) = first_text(el, &PUBLISHING)
        .map(|p| split_publishing(&p))
        .unwrap_or((None, None));

    Some(NewsItem {
        title,
        summary: first_text(el, &SUMMARY).unwrap_or_default(),
        link,
        timestamp: when.unwrap_or_else(|| captured_at.to_rfc3339()),
        source: provider.unwrap_or_else(|| SOURCE_LABEL.to_string()),
    })
}

/// Up to `limit` headlines, page order. Items without a title or link are skipped.
pub fn extract(
    body: &str,
    page_url: &Url,
    limit: usize,
    captured_at: DateTime<Utc>,
) -> Vec<NewsItem> {
    if limit == 0 {
        return Vec::new();
    }
    let doc = Html::parse_document(body);
    let root = doc.root_element();

    let mut items: Vec<NewsItem> = Vec::new();
    for sel in ITEM.iter() {
        items.extend(root.select(sel).filter_map(|el| item(el, page_url, captured_at)));
        if !items.is_empty() {
            break;
        }
    }
    items.truncate(limit);
    items
}
