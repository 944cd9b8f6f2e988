//! 동아일보 editorials.
//!
//! The desktop listing (`/news/List/700401`) loads its links by script and
//! mixes editorials with columns. The mobile listing is often
//! server-rendered, so it is tried first and, when it yields editorials,
//! used for every later page as well. Otherwise pages come from the
//! renderer or a static fetch of the desktop listing.
//!
//! A link counts as an editorial when its own text or heading carries
//! `[사설]`, or when the block around it does.

use super::{Listing, Paging, SourceAdapter, finish, markup, render_or_fetch, walk_pages};
use crate::error::ScrapeResult;
use crate::http::{Accept, Fetcher};
use crate::models::Editorial;
use crate::render::{RenderPlan, Renderer};
use crate::utils::{EDITORIAL_MARKER, char_len, resolve_url, strip_query, with_marker_prefix, ymd};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "동아일보";

const ORIGIN: &str = "https://www.donga.com/";

const LISTING: Listing = Listing {
    url: "https://www.donga.com/news/List/700401",
    paging: Paging::Query("p"),
    max_pages: 18,
    max_items: 250,
};

const MOBILE_LISTING: Listing = Listing {
    url: "https://www.donga.com/news/m/List_0401",
    ..LISTING
};

static HEADING_OR_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4, h5, a").unwrap());
static ARTICLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='article'], a[href*='/news/']").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h2, h3, h4, h5, [class*='title'], [class*='headline']").unwrap());
static DATE_IN_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/article/all/(\d{4})(\d{2})(\d{2})/").unwrap());
static DATE_IN_URL_ALT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4})(\d{2})(\d{2})/\d+").unwrap());

pub struct Donga {
    renderer: Option<Arc<dyn Renderer>>,
}

fn settle_plan() -> RenderPlan {
    RenderPlan::Settle {
        wait_for: Some("h4, a[href*='article'], [class*='tit'], [class*='title']".into()),
        wait_timeout: Duration::from_secs(10),
        settle: Duration::from_millis(1500),
    }
}

impl Donga {
    pub fn new(renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self { renderer }
    }

    /// Page 1, mobile first, with one retry after a short pause.
    async fn first_page(&self, fetcher: &Fetcher, use_mobile: &AtomicBool) -> Option<Vec<Editorial>> {
        let mut last = None;
        for attempt in 0..2 {
            if attempt > 0 {
                debug!("first page came back empty; retrying");
                sleep(Duration::from_secs(1)).await;
            }
            let mobile = fetcher.get_optional(MOBILE_LISTING.url).await;
            if let Some(html) = &mobile {
                let items = parse_listing(html);
                if !items.is_empty() {
                    debug!(count = items.len(), "using mobile listing");
                    use_mobile.store(true, Ordering::Relaxed);
                    return Some(items);
                }
            }
            let desktop = render_or_fetch(self.renderer.as_deref(), &settle_plan(), fetcher, LISTING.url).await;
            let Some(html) = desktop.or(mobile) else {
                continue;
            };
            let items = parse_listing(&html);
            if !items.is_empty() {
                return Some(items);
            }
            last = Some(items);
        }
        last
    }

    async fn fetch_page(&self, fetcher: &Fetcher, use_mobile: &AtomicBool, page: usize) -> Option<Vec<Editorial>> {
        if page == 1 {
            return self.first_page(fetcher, use_mobile).await;
        }
        let html = if use_mobile.load(Ordering::Relaxed) {
            fetcher.get_optional(&MOBILE_LISTING.page_url(page)).await
        } else {
            render_or_fetch(self.renderer.as_deref(), &settle_plan(), fetcher, &LISTING.page_url(page)).await
        }?;
        Some(parse_listing(&html))
    }

    async fn walk(&self, target: Option<NaiveDate>) -> ScrapeResult<Vec<Editorial>> {
        let fetcher = Fetcher::new(Accept::Html, Some(ORIGIN), Duration::from_secs(15))?;
        let use_mobile = AtomicBool::new(false);
        let (fetcher, use_mobile) = (&fetcher, &use_mobile);
        let items = walk_pages(LISTING.max_pages, target, move |page| {
            self.fetch_page(fetcher, use_mobile, page)
        })
        .await;
        info!(count = items.len(), "collected from listing");
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for Donga {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
        Ok(finish(self.walk(None).await?, LISTING.max_items))
    }

    #[instrument(level = "info", skip(self), fields(source = SOURCE_NAME))]
    async fn fetch_for_date(&self, date: NaiveDate) -> ScrapeResult<Vec<Editorial>> {
        self.walk(Some(date)).await
    }
}

fn url_date(url: &str) -> Option<NaiveDate> {
    DATE_IN_URL
        .captures(url)
        .or_else(|| DATE_IN_URL_ALT.captures(url))
        .and_then(|c| ymd(&c[1], &c[2], &c[3]))
}

/// Resolved, query-free article URL and its date, for a usable link.
fn dated_link(base: &Url, a: ElementRef<'_>) -> Option<(String, NaiveDate)> {
    let href = markup::href(a)?;
    if href.contains("javascript") {
        return None;
    }
    let url = resolve_url(base, href)?;
    let date = url_date(&url)?;
    Some((strip_query(&url).to_string(), date))
}

/// Extract editorials from one listing page.
pub fn parse_listing(html: &str) -> Vec<Editorial> {
    let Ok(base) = Url::parse(ORIGIN) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut add = |url: String, title: &str, date: NaiveDate| {
        if seen.insert(url.clone()) {
            out.push(Editorial::new(SOURCE_NAME, with_marker_prefix(title), url, date));
        }
    };

    // Headings or links that carry the marker themselves.
    for el in doc.select(&HEADING_OR_LINK) {
        let text = markup::text(el);
        if !text.contains(EDITORIAL_MARKER) || char_len(&text) < 10 {
            continue;
        }
        let link = if el.value().name() == "a" {
            Some(el)
        } else {
            markup::closest(el, &["a"])
        };
        if let Some((url, date)) = link.and_then(|a| dated_link(&base, a)) {
            add(url, &text, date);
        }
    }

    // Dated article links whose surrounding block carries the marker.
    for a in doc.select(&ARTICLE_LINK) {
        let Some((url, date)) = dated_link(&base, a) else {
            continue;
        };
        let block = markup::closest(a, &["article", "li", "div", "section"]);
        let mut title = markup::text(a);
        if char_len(&title) < 5 {
            if let Some(h) = block.and_then(|b| markup::first(b, &TITLE)) {
                title = markup::text(h);
            }
        }
        if char_len(&title) < 5 {
            continue;
        }
        let tagged = title.starts_with(EDITORIAL_MARKER)
            || block.is_some_and(|b| markup::raw_text(b).contains(EDITORIAL_MARKER))
            || title.contains(EDITORIAL_MARKER);
        if tagged {
            add(url, &title, date);
        }
    }
    out
}
