//! 한겨레 editorials.
//!
//! Listing entries link to `/arti/opinion/editorial/NNN.html` and show the
//! first lines of the piece, which are kept as the summary.

use super::{Listing, Paging, SourceAdapter, markup, walk_static};
use crate::error::ScrapeResult;
use crate::http::{Charset, Fetcher};
use crate::models::Editorial;
use crate::utils::{DateFormat, char_len, find_date_in_text, resolve_url, strip_query, truncate_chars, ymd};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "한겨레";

const ORIGIN: &str = "https://www.hani.co.kr/";
const SUMMARY_CHARS: usize = 220;

const LISTING: Listing = Listing {
    url: "https://www.hani.co.kr/arti/opinion/editorial",
    paging: Paging::Query("page"),
    max_pages: 12,
    max_items: 200,
};

static EDITORIAL_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href*='/arti/opinion/editorial/']").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse(".article-title, .tit, h2, h3, .title").unwrap());
static TEASER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, .article-summary, [class*='desc'], [class*='lead']").unwrap());
static PATH_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})[/-](\d{2})[/-](\d{2})").unwrap());

pub struct Hani;

#[async_trait]
impl SourceAdapter for Hani {
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
    for a in doc.select(&EDITORIAL_LINK) {
        let Some(url) = markup::href(a).and_then(|h| resolve_url(&base, h)) else {
            continue;
        };
        if !url.contains(".html") {
            continue;
        }
        let title_el = markup::first(a, &TITLE);
        let title = title_el.map(markup::text).unwrap_or_else(|| markup::text(a));
        if char_len(&title) < 2 {
            continue;
        }
        let block = markup::closest(a, &["li", "div", "article", "section"]);
        let from_url = PATH_DATE.captures(&url).and_then(|c| ymd(&c[1], &c[2], &c[3]));
        let date = from_url.or_else(|| {
            block.and_then(|b| {
                find_date_in_text(&markup::raw_text(b), &[DateFormat::Dashed, DateFormat::Dotted])
            })
        });
        let Some(date) = date else {
            continue;
        };
        let summary = block.and_then(|b| {
            let teaser = markup::first(b, &TEASER)
                .filter(|t| Some(*t) != title_el)
                .map(|t| markup::text(t).replacen(&title, "", 1).trim().to_string())
                .filter(|s| !s.is_empty());
            teaser.or_else(|| {
                let full = markup::spaced_text(b);
                let skip = char_len(&title);
                (char_len(&full) > skip + 20).then(|| full.chars().skip(skip).collect::<String>().trim().to_string())
            })
        });
        let summary = summary.map(|s| truncate_chars(&s, SUMMARY_CHARS));
        out.push(Editorial::new(SOURCE_NAME, title, strip_query(&url), date).with_summary(summary));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, dd).unwrap()
    }

    #[test]
    fn test_parse_listing_with_teaser() {
        let html = r#"<ul class="ArticleList_list">
          <li class="ArticleList_item">
            <a href="/arti/opinion/editorial/1243210.html">
              <div class="article-title">[사설] 검찰개혁, 속도보다 방향이다</div>
            </a>
            <p class="article-prologue">[사설] 검찰개혁, 속도보다 방향이다 정부가 내놓은 개혁안은</p>
            <div class="article-date">2026-02-12 18:05</div>
          </li>
          <li class="ArticleList_item">
            <a href="/arti/opinion/editorial/list.html">목록</a>
          </li>
          <li><a href="/arti/opinion/editorial/1243100">확장자 없음</a></li>
        </ul>"#;
        let items = parse_listing(html);
        assert_eq!(items.len(), 1);
        let e = &items[0];
        assert_eq!(e.title, "[사설] 검찰개혁, 속도보다 방향이다");
        assert_eq!(e.url, "https://www.hani.co.kr/arti/opinion/editorial/1243210.html");
        assert_eq!(e.published_date, d(12));
        assert_eq!(e.summary.as_deref(), Some("정부가 내놓은 개혁안은"));
    }

    #[test]
    fn test_date_from_url_path() {
        let html = r#"<div><a href="https://www.hani.co.kr/arti/opinion/editorial/2026/02/11/1243000.html">[사설] 제목</a></div>"#;
        let items = parse_listing(html);
        assert_eq!(items[0].published_date, d(11));
        assert_eq!(items[0].summary, None);
    }
}
