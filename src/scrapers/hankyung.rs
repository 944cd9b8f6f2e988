//! 한국경제신문 editorials.
//!
//! The `/opinion/0001` section lists editorials only, but other opinion
//! blocks share the page chrome. Blocks that mention `[사설]` are scanned for
//! their article link first; when a page has no such block the article links
//! are walked directly and checked against their enclosing block.

use super::{Listing, Paging, SourceAdapter, markup, walk_static};
use crate::error::ScrapeResult;
use crate::http::{Charset, Fetcher};
use crate::models::Editorial;
use crate::utils::{DateFormat, EDITORIAL_MARKER, find_date_in_text, resolve_url, strip_query, ymd};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "한국경제신문";

const ORIGIN: &str = "https://www.hankyung.com/";

const LISTING: Listing = Listing {
    url: "https://www.hankyung.com/opinion/0001",
    paging: Paging::Query("page"),
    max_pages: 12,
    max_items: 200,
};

static BLOCK: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("article, li, div[class*='news'], div[class*='list'], div[class*='item']").unwrap()
});
static ARTICLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*='/article/']").unwrap());
static BLOCK_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, [class*='title'], [class*='headline']").unwrap());
static PARENT_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4, [class*='title']").unwrap());
static ARTICLE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/article/\d+").unwrap());
static DATED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/article/(\d{4})(\d{2})(\d{2})").unwrap());

pub struct Hankyung;

#[async_trait]
impl SourceAdapter for Hankyung {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
        let fetcher = Fetcher::user_agent_only(Duration::from_secs(15))?;
        let items = walk_static(&fetcher, &LISTING, Charset::Utf8, parse_listing).await;
        info!(count = items.len(), "collected from listing");
        Ok(items)
    }
}

/// Article URL (query dropped) of `a` when it points at a numbered article.
fn article_url(base: &Url, a: ElementRef<'_>) -> Option<String> {
    let url = resolve_url(base, markup::href(a)?)?;
    ARTICLE_ID
        .is_match(&url)
        .then(|| strip_query(&url).to_string())
}

/// Date from the article id, else the first dotted date in `context`.
fn article_date(url: &str, context: &str) -> Option<NaiveDate> {
    DATED_ID
        .captures(url)
        .and_then(|c| ymd(&c[1], &c[2], &c[3]))
        .or_else(|| find_date_in_text(context, &[DateFormat::Dotted]))
}

/// Extract editorials from one listing page.
pub fn parse_listing(html: &str) -> Vec<Editorial> {
    let Ok(base) = Url::parse(ORIGIN) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut out = Vec::new();

    for block in doc.select(&BLOCK) {
        let text = markup::raw_text(block);
        if !text.contains(EDITORIAL_MARKER) {
            continue;
        }
        let Some(a) = markup::first(block, &ARTICLE_LINK) else {
            continue;
        };
        let Some(url) = article_url(&base, a) else {
            continue;
        };
        let title = markup::first(block, &BLOCK_TITLE)
            .map(markup::text)
            .unwrap_or_else(|| markup::text(a));
        if !title.starts_with(EDITORIAL_MARKER) {
            continue;
        }
        if let Some(date) = article_date(&url, &text) {
            out.push(Editorial::new(SOURCE_NAME, title, url, date));
        }
    }
    if !out.is_empty() {
        return out;
    }

    for a in doc.select(&ARTICLE_LINK) {
        let Some(url) = article_url(&base, a) else {
            continue;
        };
        let Some(parent) = markup::closest(a, &["li", "div", "article"]) else {
            continue;
        };
        let text = markup::raw_text(parent);
        if !text.contains(EDITORIAL_MARKER) {
            continue;
        }
        let title = markup::first(parent, &PARENT_TITLE)
            .map(markup::text)
            .unwrap_or_else(|| markup::text(a));
        if !title.starts_with(EDITORIAL_MARKER) {
            continue;
        }
        if let Some(date) = article_date(&url, &text) {
            out.push(Editorial::new(SOURCE_NAME, title, url, date));
        }
    }
    out
}
