//! 국민일보 editorials.
//!
//! The opinion listing (`sid1=opi`) mixes columns and editorials. Article
//! ids live in the `arcid=` query parameter, so only the fragment is dropped
//! from URLs. Dates are read from the listing entry's text.

use super::{Listing, Paging, SourceAdapter, markup, walk_static};
use crate::error::ScrapeResult;
use crate::http::{Accept, Charset, Fetcher};
use crate::models::Editorial;
use crate::utils::{
    DateFormat, EDITORIAL_MARKER, char_len, find_date_in_text, resolve_url, strip_fragment, with_marker_prefix,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "국민일보";

const LISTING: Listing = Listing {
    url: "https://www.kmib.co.kr/article/listing.asp?sid1=opi",
    paging: Paging::Query("page"),
    max_pages: 12,
    max_items: 200,
};

static ARTICLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='view.asp'], a[href*='arcid=']").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, .tit, .title, [class*='title']").unwrap());

pub struct Kmib;

#[async_trait]
impl SourceAdapter for Kmib {
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
    let Ok(base) = Url::parse(LISTING.url) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for a in doc.select(&ARTICLE_LINK) {
        let Some(href) = markup::href(a).filter(|h| h.contains("arcid=")) else {
            continue;
        };
        let Some(url) = resolve_url(&base, href) else {
            continue;
        };
        let title = markup::heading_or_self(a, &TITLE);
        if char_len(&title) < 5 {
            continue;
        }
        if !title.contains(EDITORIAL_MARKER)
            && !markup::closest(a, &["li", "div", "article", "section"])
                .is_some_and(|b| markup::raw_text(b).contains(EDITORIAL_MARKER))
        {
            continue;
        }
        let date = markup::closest(a, &["li", "div", "article", "section", "tr"]).and_then(|b| {
            find_date_in_text(
                &markup::raw_text(b),
                &[DateFormat::Dotted, DateFormat::Dashed, DateFormat::Compact],
            )
        });
        let Some(date) = date else {
            continue;
        };
        out.push(Editorial::new(
            SOURCE_NAME,
            with_marker_prefix(&title),
            strip_fragment(&url),
            date,
        ));
    }
    out
}
