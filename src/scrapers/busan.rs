//! 부산일보 editorials.
//!
//! The opinion front page pages by path segment (`/opinionmain/2/`). Article
//! links are `view.php?code=YYYYMMDDHHMMSS…`. Editorial entries are not
//! tagged individually; the section heading above them says 사설, so any
//! ancestor within fifteen levels mentioning it qualifies the link.

use super::{Listing, Paging, SourceAdapter, markup, walk_static};
use crate::error::ScrapeResult;
use crate::http::{Accept, Charset, Fetcher};
use crate::models::Editorial;
use crate::utils::{EDITORIAL_MARKER, char_len, compact_date, resolve_url, strip_fragment, with_marker_prefix};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const SOURCE_NAME: &str = "부산일보";

const ORIGIN: &str = "https://www.busan.com/";
const SECTION_WORD: &str = "사설";
const ANCESTOR_DEPTH: usize = 15;
const MAX_TITLE_CHARS: usize = 200;

const LISTING: Listing = Listing {
    url: "https://www.busan.com/opinionmain/",
    paging: Paging::PathSegment,
    max_pages: 12,
    max_items: 200,
};

static CODE_LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href*='code=']").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h2, h3, h4, .tit, .title, [class*='title'], [class*='headline']").unwrap()
});
static CODE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"code=(\d{8})").unwrap());

pub struct Busan;

#[async_trait]
impl SourceAdapter for Busan {
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

fn clip_title(title: String) -> String {
    if char_len(&title) > MAX_TITLE_CHARS {
        let head: String = title.chars().take(MAX_TITLE_CHARS - 3).collect();
        format!("{head}...")
    } else {
        title
    }
}

/// Extract editorials from one listing page.
pub fn parse_listing(html: &str) -> Vec<Editorial> {
    let Ok(base) = Url::parse(ORIGIN) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for a in doc.select(&CODE_LINK) {
        let Some(href) = markup::href(a).filter(|h| !h.contains("javascript") && h.contains("view.php")) else {
            continue;
        };
        let Some(url) = resolve_url(&base, href) else {
            continue;
        };
        let url = strip_fragment(&url);
        let Some(date) = CODE_DATE.captures(url).and_then(|c| compact_date(&c[1])) else {
            continue;
        };
        let title = clip_title(markup::heading_or_self(a, &TITLE));
        if char_len(&title) < 2 {
            continue;
        }
        if !title.contains(SECTION_WORD) && !markup::ancestor_contains(a, SECTION_WORD, ANCESTOR_DEPTH) {
            continue;
        }
        let title = if title.contains(EDITORIAL_MARKER) {
            title
        } else {
            with_marker_prefix(&title)
        };
        out.push(Editorial::new(SOURCE_NAME, title, url, date));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_listing() {
        let html = r#"<div class="opinion_main">
          <section class="box"><h2 class="section-title">사설</h2>
            <ul><li><a href="/view/busan/view.php?code=2026021218301234#reply">북항 재개발 속도 내야</a></li>
            <li><a href="/view/busan/view.php?code=abc">번호 없음</a></li></ul>
          </section>
        </div>"#;
        let items = parse_listing(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "[사설] 북항 재개발 속도 내야");
        assert_eq!(
            items[0].url,
            "https://www.busan.com/view/busan/view.php?code=2026021218301234"
        );
        assert_eq!(items[0].published_date, NaiveDate::from_ymd_opt(2026, 2, 12).unwrap());
    }

    #[test]
    fn test_untagged_page_yields_nothing() {
        let html = r#"<section><h2>칼럼</h2>
          <ul><li><a href="/view/busan/view.php?code=2026021218005678">데스크 칼럼 제목</a></li></ul>
        </section>"#;
        assert!(parse_listing(html).is_empty());
    }

    #[test]
    fn test_clip_title() {
        let long = "가".repeat(250);
        let clipped = clip_title(long);
        assert_eq!(char_len(&clipped), 200);
        assert!(clipped.ends_with("..."));
    }
}
