//! 매일경제 editorials.
//!
//! Entries link to `/news/editorial/NNNNNNNN`. The listing prints dates
//! either as `2026.02.10` or as `02.10 2026`; both are accepted, from the
//! entry block first and the link text second.

use super::{Listing, Paging, SourceAdapter, markup, walk_static};
use crate::error::ScrapeResult;
use crate::http::{Accept, Charset, Fetcher};
use crate::models::Editorial;
use crate::utils::{
    DateFormat, EDITORIAL_MARKER, char_len, find_date_in_text, resolve_url, strip_query, truncate_chars,
    with_marker_prefix,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "매일경제";

const ORIGIN: &str = "https://www.mk.co.kr/";
const DATE_FORMATS: [DateFormat; 3] = [DateFormat::Dotted, DateFormat::Dashed, DateFormat::MonthDayYear];

const LISTING: Listing = Listing {
    url: "https://www.mk.co.kr/opinion/editorial/",
    paging: Paging::Query("page"),
    max_pages: 12,
    max_items: 200,
};

static EDITORIAL_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*='/news/editorial/']").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, h5, .tit, .title, [class*='title']").unwrap());
static BLOCK_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, h5, .tit, [class*='title']").unwrap());
static SUMMARY: Lazy<Selector> = Lazy::new(|| Selector::parse("p, [class*='desc'], [class*='summary']").unwrap());
static ARTICLE_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/news/editorial/\d+$").unwrap());

pub struct Mk;

#[async_trait]
impl SourceAdapter for Mk {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
        let fetcher = Fetcher::new(Accept::Html, None, Duration::from_secs(20))?;
        let items = walk_static(&fetcher, &LISTING, Charset::Utf8, parse_listing).await;
        info!(count = items.len(), "collected from listing");
        Ok(items)
    }
}

/// Extract editorials from one listing page.
pub fn parse_listing(html: &str) -> Vec<Editorial> {
    let Ok(base) = Url::parse(ORIGIN) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for a in doc.select(&EDITORIAL_LINK) {
        let Some(url) = markup::href(a).and_then(|h| resolve_url(&base, h)) else {
            continue;
        };
        let url = strip_query(&url);
        if !ARTICLE_PATH.is_match(url) {
            continue;
        }
        let block = markup::closest(a, &["li", "div", "article", "section"]);
        let block_text = block.map(markup::raw_text).unwrap_or_default();
        let Some(date) = find_date_in_text(&block_text, &DATE_FORMATS)
            .or_else(|| find_date_in_text(&markup::raw_text(a), &DATE_FORMATS))
        else {
            continue;
        };
        let mut title = markup::heading_or_self(a, &TITLE);
        if char_len(&title) < 2 {
            if let Some(h) = block.and_then(|b| markup::first(b, &BLOCK_TITLE)) {
                title = markup::text(h);
            }
        }
        if char_len(&title) < 2 {
            continue;
        }
        if !title.contains(EDITORIAL_MARKER) && block_text.contains(EDITORIAL_MARKER) {
            title = with_marker_prefix(&title);
        }
        let summary = block
            .and_then(|b| markup::first(b, &SUMMARY))
            .map(|p| truncate_chars(&markup::text(p), 200));
        out.push(Editorial::new(SOURCE_NAME, title, url, date).with_summary(summary));
    }
    out
}
