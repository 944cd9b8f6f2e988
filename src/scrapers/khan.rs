//! 경향신문 editorials. Article ids start with the publish date:
//! `/article/YYYYMMDDHHMM…`.

use super::{Listing, Paging, SourceAdapter, markup, walk_static};
use crate::error::ScrapeResult;
use crate::http::{Charset, Fetcher};
use crate::models::Editorial;
use crate::utils::{char_len, resolve_url, strip_query, ymd};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "경향신문";

const ORIGIN: &str = "https://www.khan.co.kr/";

const LISTING: Listing = Listing {
    url: "https://www.khan.co.kr/opinion/editorial/articles",
    paging: Paging::Query("page"),
    max_pages: 12,
    max_items: 200,
};

static ARTICLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*='/article/']").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, .title, [class*='headline'], [class*='title']").unwrap());
static BLOCK_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4, [class*='title']").unwrap());
static LONG_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/article/\d{10,}").unwrap());
static DATED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/article/(\d{4})(\d{2})(\d{2})\d+").unwrap());

pub struct Khan;

#[async_trait]
impl SourceAdapter for Khan {
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

/// Extract editorials from one listing page.
pub fn parse_listing(html: &str) -> Vec<Editorial> {
    let Ok(base) = Url::parse(ORIGIN) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for a in doc.select(&ARTICLE_LINK) {
        let Some(full) = markup::href(a).and_then(|h| resolve_url(&base, h)) else {
            continue;
        };
        // pager links reuse the article path
        if full.contains("?page=") {
            continue;
        }
        let url = strip_query(&full);
        if !LONG_ID.is_match(url) {
            continue;
        }
        let mut title = markup::heading_or_self(a, &TITLE);
        if char_len(&title) < 2 {
            if let Some(h) = markup::closest(a, &["article", "li", "div"]).and_then(|b| markup::first(b, &BLOCK_TITLE)) {
                title = markup::text(h);
            }
        }
        if char_len(&title) < 2 {
            continue;
        }
        let Some(date) = DATED_ID.captures(url).and_then(|c| ymd(&c[1], &c[2], &c[3])) else {
            continue;
        };
        out.push(Editorial::new(SOURCE_NAME, title, url, date));
    }
    out
}
