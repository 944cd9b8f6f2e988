//! 조선일보 editorials.
//!
//! The opinion RSS feed is tried first because it works without a browser;
//! it mixes columns and editorials, so only items tagged `[사설]` or living
//! under `/opinion/editorial/` are kept. When the feed yields nothing the
//! editorial listing is walked page by page. That listing fills in by
//! script, so each page goes through the renderer when one is configured.
//!
//! Article URLs carry the date: `/opinion/editorial/YYYY/MM/DD/ID/`.

use super::{Listing, Paging, SourceAdapter, finish, markup, render_or_fetch, walk_pages};
use crate::error::ScrapeResult;
use crate::http::{Accept, Fetcher};
use crate::models::Editorial;
use crate::render::{RenderPlan, Renderer};
use crate::rss;
use crate::utils::{EDITORIAL_MARKER, char_len, dedup_by_url, resolve_url, strip_query, today, truncate_chars, ymd};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "조선일보";

const ORIGIN: &str = "https://www.chosun.com/";
const OPINION_RSS: &str = "https://www.chosun.com/arc/outboundfeeds/rss/category/opinion/?outputType=xml";

const LISTING: Listing = Listing {
    url: "https://www.chosun.com/opinion/editorial/",
    paging: Paging::Query("page"),
    max_pages: 18,
    max_items: 250,
};

static EDITORIAL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='/opinion/editorial/']").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, [class*='title'], [class*='headline']").unwrap());
static SUMMARY: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, [class*='desc'], [class*='summary'], [class*='lead']").unwrap());
static DATED_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/editorial/(\d{4})/(\d{2})/(\d{2})/([^/?#]+)").unwrap());

pub struct Chosun {
    renderer: Option<Arc<dyn Renderer>>,
}

impl Chosun {
    pub fn new(renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self { renderer }
    }

    /// Editorial-only items from the opinion feed; empty when the feed is
    /// unreachable or malformed.
    async fn feed_editorials(&self) -> Vec<Editorial> {
        let fetcher = match Fetcher::new(Accept::Feed, None, Duration::from_secs(20)) {
            Ok(f) => f,
            Err(e) => {
                debug!(error = %e, "feed client unavailable");
                return Vec::new();
            }
        };
        match rss::fetch_feed(&fetcher, OPINION_RSS, SOURCE_NAME, today()).await {
            Ok(items) => items.into_iter().filter(is_editorial_item).collect(),
            Err(e) => {
                debug!(error = %e, "opinion feed unavailable");
                Vec::new()
            }
        }
    }

    async fn fetch_page(&self, fetcher: &Fetcher, page: usize) -> Option<Vec<Editorial>> {
        let plan = RenderPlan::Settle {
            wait_for: Some("a[href*='/opinion/editorial/']".into()),
            wait_timeout: Duration::from_secs(15),
            settle: Duration::from_millis(1500),
        };
        let html = render_or_fetch(self.renderer.as_deref(), &plan, fetcher, &LISTING.page_url(page)).await?;
        Some(parse_listing(&html))
    }

    fn page_fetcher() -> ScrapeResult<Fetcher> {
        Fetcher::new(Accept::Html, Some(ORIGIN), Duration::from_secs(15))
    }
}

#[async_trait]
impl SourceAdapter for Chosun {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
        let feed = self.feed_editorials().await;
        if !feed.is_empty() {
            info!(count = feed.len(), "collected from opinion feed");
            return Ok(finish(feed, LISTING.max_items));
        }
        let fetcher = Self::page_fetcher()?;
        let fetcher = &fetcher;
        let items = walk_pages(LISTING.max_pages, None, move |page| self.fetch_page(fetcher, page)).await;
        info!(count = items.len(), "collected from listing");
        Ok(finish(items, LISTING.max_items))
    }

    #[instrument(level = "info", skip(self), fields(source = SOURCE_NAME))]
    async fn fetch_for_date(&self, date: NaiveDate) -> ScrapeResult<Vec<Editorial>> {
        let feed: Vec<_> = self
            .feed_editorials()
            .await
            .into_iter()
            .filter(|e| e.published_date == date)
            .collect();
        if !feed.is_empty() {
            info!(count = feed.len(), "collected from opinion feed");
            return Ok(dedup_by_url(feed));
        }
        let fetcher = Self::page_fetcher()?;
        let fetcher = &fetcher;
        let items = walk_pages(LISTING.max_pages, Some(date), move |page| self.fetch_page(fetcher, page)).await;
        info!(count = items.len(), "collected from listing");
        Ok(items)
    }
}

fn is_editorial_item(e: &Editorial) -> bool {
    e.title.contains(EDITORIAL_MARKER) || e.url.contains("/opinion/editorial/")
}

/// Usable headline: at least two characters and not just the section name.
fn usable_title(t: &str) -> bool {
    char_len(t) >= 2 && t != "사설"
}

/// Extract dated editorial links from one listing page.
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
        let Some(date) = DATED_PATH
            .captures(&url)
            .and_then(|c| ymd(&c[1], &c[2], &c[3]))
        else {
            continue;
        };
        let block = markup::closest(a, &["article", "li", "div"]);
        let mut title = markup::heading_or_self(a, &TITLE);
        if !usable_title(&title) {
            if let Some(h) = block.and_then(|b| markup::first(b, &TITLE)) {
                title = markup::text(h);
            }
        }
        if char_len(&title) < 2 {
            continue;
        }
        let summary = block
            .and_then(|b| markup::first(b, &SUMMARY))
            .map(|d| truncate_chars(&markup::text(d), 200));
        out.push(Editorial::new(SOURCE_NAME, title, strip_query(&url), date).with_summary(summary));
    }
    out
}
