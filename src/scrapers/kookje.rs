//! 국제신문 editorials.
//!
//! The listing is served as EUC-KR. Article links look like
//! `newsbody.asp?code=1710&key=YYYYMMDD.NNNN`; the date comes from `key=`.
//! Links carrying the editorial section code (`code=1710` or `kid=1710`)
//! are editorials by construction; anything else needs the marker.

use super::{Listing, Paging, SourceAdapter, markup, walk_static};
use crate::error::ScrapeResult;
use crate::http::{Accept, Charset, Fetcher};
use crate::models::Editorial;
use crate::utils::{EDITORIAL_MARKER, char_len, resolve_url, strip_fragment, truncate_chars, with_marker_prefix, ymd};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "국제신문";

const LISTING: Listing = Listing {
    url: "https://www.kookje.co.kr/news2011/asp/list.asp?code=1710",
    paging: Paging::Query("page"),
    max_pages: 12,
    max_items: 200,
};

static ARTICLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*='newsbody.asp']").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, .tit, .title, [class*='title']").unwrap());
static KEY_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"key=(\d{4})(\d{2})(\d{2})(?:\.\d+)?").unwrap());

pub struct Kookje;

#[async_trait]
impl SourceAdapter for Kookje {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
        let fetcher = Fetcher::new(Accept::Html, None, Duration::from_secs(20))?;
        let items = walk_static(&fetcher, &LISTING, Charset::EucKr, parse_listing).await;
        info!(count = items.len(), "collected from listing");
        Ok(items)
    }
}

fn in_editorial_section(url: &str) -> bool {
    url.contains("kid=1710") || url.contains("code=1710")
}

/// Extract editorials from one decoded listing page.
pub fn parse_listing(html: &str) -> Vec<Editorial> {
    let Ok(base) = Url::parse(LISTING.url) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for a in doc.select(&ARTICLE_LINK) {
        let Some(href) = markup::href(a).filter(|h| !h.contains("javascript") && h.contains("key=")) else {
            continue;
        };
        let Some(url) = resolve_url(&base, href) else {
            continue;
        };
        let url = strip_fragment(&url);
        let Some(date) = KEY_DATE.captures(url).and_then(|c| ymd(&c[1], &c[2], &c[3])) else {
            continue;
        };
        let title = markup::heading_or_self(a, &TITLE);
        // teaser text sometimes rides along after a line break
        let title = truncate_chars(title.lines().next().unwrap_or_default().trim(), 300);
        if char_len(&title) < 3 {
            continue;
        }
        if !in_editorial_section(url)
            && !title.contains(EDITORIAL_MARKER)
            && !markup::closest(a, &["li", "div", "article", "p", "td"])
                .is_some_and(|b| markup::raw_text(b).contains(EDITORIAL_MARKER))
        {
            continue;
        }
        out.push(Editorial::new(SOURCE_NAME, with_marker_prefix(&title), url, date));
    }
    out
}
