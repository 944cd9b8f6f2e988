//! 중앙일보 editorials.
//!
//! The listing is usually server-rendered. When page 1 comes back without a
//! single article link the page is rendered instead. Dates come from the
//! enclosing block's text, or from the article id when it starts with
//! `YYYYMMDD`.

use super::{Listing, Paging, SourceAdapter, finish, markup, walk_pages};
use crate::error::ScrapeResult;
use crate::http::{Accept, Fetcher};
use crate::models::Editorial;
use crate::render::{RenderPlan, Renderer};
use crate::utils::{DateFormat, char_len, find_date_in_text, resolve_url, strip_query, ymd};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "중앙일보";

const ORIGIN: &str = "https://www.joongang.co.kr/";

const LISTING: Listing = Listing {
    url: "https://www.joongang.co.kr/opinion/editorial",
    paging: Paging::Query("page"),
    max_pages: 18,
    max_items: 250,
};

static ARTICLE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*='/article/']").unwrap());
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".headline, .tit, h2, h3, h4, [class*='title']").unwrap());
static ARTICLE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/article/(\d{6,})").unwrap());
static DATED_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/article/(20\d{2})(0[1-9]|1[0-2])(0[1-9]|[12]\d|3[01])\d*").unwrap()
});

pub struct Joongang {
    renderer: Option<Arc<dyn Renderer>>,
}

impl Joongang {
    pub fn new(renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self { renderer }
    }

    async fn fetch_page(&self, fetcher: &Fetcher, page: usize) -> Option<Vec<Editorial>> {
        let url = LISTING.page_url(page);
        let html = fetcher.get_optional(&url).await?;
        let items = parse_listing(&html);
        if page > 1 || !items.is_empty() {
            return Some(items);
        }
        let renderer = self.renderer.as_deref()?;
        debug!("static listing had no article links; rendering");
        let plan = RenderPlan::Settle {
            wait_for: Some("a[href*='/article/']".into()),
            wait_timeout: Duration::from_secs(10),
            settle: Duration::from_millis(800),
        };
        renderer.render(&url, &plan).await.ok().map(|html| parse_listing(&html))
    }

    async fn walk(&self, target: Option<NaiveDate>) -> ScrapeResult<Vec<Editorial>> {
        let fetcher = Fetcher::new(Accept::Html, None, Duration::from_secs(20))?;
        let fetcher = &fetcher;
        let items = walk_pages(LISTING.max_pages, target, move |page| self.fetch_page(fetcher, page)).await;
        info!(count = items.len(), "collected from listing");
        Ok(items)
    }
}

#[async_trait]
impl SourceAdapter for Joongang {
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

/// Extract dated article links from one listing page.
pub fn parse_listing(html: &str) -> Vec<Editorial> {
    let Ok(base) = Url::parse(ORIGIN) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for a in doc.select(&ARTICLE_LINK) {
        let Some(url) = markup::href(a).and_then(|h| resolve_url(&base, h)) else {
            continue;
        };
        let url = strip_query(&url);
        if !ARTICLE_ID.is_match(url) {
            continue;
        }
        let title = markup::heading_or_self(a, &TITLE);
        if char_len(&title) < 2 {
            continue;
        }
        let from_block = markup::closest(a, &["li", "div", "article", "section"]).and_then(|b| {
            find_date_in_text(
                &markup::raw_text(b),
                &[DateFormat::Dashed, DateFormat::Dotted, DateFormat::Compact],
            )
        });
        let date = from_block.or_else(|| {
            DATED_ID
                .captures(url)
                .and_then(|c| ymd(&c[1], &c[2], &c[3]))
        });
        let Some(date) = date else {
            continue;
        };
        out.push(Editorial::new(SOURCE_NAME, title, url, date));
    }
    out
}
