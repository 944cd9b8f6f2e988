//! 네이버 오피니언 editorial aggregator.
//!
//! Unlike the publisher adapters this one collects every outlet's editorials
//! for a date at once, so each record carries the publisher inferred from the
//! link rather than this adapter's name. Two paths:
//!
//! 1. Render the editorial tab (`/opinion/editorial?date=YYYYMMDD`) and
//!    scroll until the number of article links stops growing. Bounded at
//!    18 seconds; skipped without a renderer.
//! 2. When that produced fewer than 30 links, merge in the static editorial
//!    tab and the paginated section list (`main/list.naver`), trying the
//!    newspaper-edition listing before the headline listing.
//!
//! Records are dated with the requested date. An error is reported only when
//! both paths together yield nothing.

use super::{SourceAdapter, markup};
use crate::error::{ScrapeError, ScrapeResult};
use crate::http::{Accept, Fetcher};
use crate::models::Editorial;
use crate::render::{RenderPlan, Renderer};
use crate::utils::{dedup_by_url, ensure_title, strip_time_suffix, today, truncate_chars};
use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

pub const SOURCE_NAME: &str = "네이버 오피니언";

const EDITORIAL_URL: &str = "https://news.naver.com/opinion/editorial";
const LIST_URL: &str = "https://news.naver.com/main/list.naver";
const ARTICLE_HOST: &str = "https://n.news.naver.com";
const OPINION_SECTION_QUERY: &str = "?sid=110";
const ARTICLE_MARKER: &str = "mnews/article/";

const UNKNOWN_PUBLISHER: &str = "알 수 없음";
const OTHER_PUBLISHER: &str = "기타";
const MARKERS: [&str; 2] = ["[사설]", "[논설실의 관점]"];

const RENDER_BUDGET: Duration = Duration::from_secs(18);
const MIN_RENDERED: usize = 30;
const LIST_MAX_PAGES: usize = 30;
const LIST_TYPES: [&str; 2] = ["paper", "title"];
const MAX_ITEMS: usize = 250;
const MAX_TITLE_CHARS: usize = 200;

/// Naver office id → publisher name.
const OFFICES: &[(&str, &str)] = &[
    ("001", "연합뉴스"), ("002", "프레시안"), ("003", "뉴시스"), ("005", "국민일보"),
    ("006", "미디어오늘"), ("007", "일다"), ("008", "머니투데이"), ("009", "매일경제"),
    ("011", "서울경제"), ("014", "파이낸셜뉴스"), ("015", "한국경제"), ("016", "헤럴드경제"),
    ("018", "이데일리"), ("020", "동아일보"), ("021", "문화일보"), ("022", "세계일보"),
    ("023", "조선일보"), ("024", "매경이코노미"), ("025", "중앙일보"), ("028", "한겨레"),
    ("029", "디지털타임스"), ("030", "전자신문"), ("031", "아이뉴스24"), ("032", "경향신문"),
    ("033", "주간경향"), ("036", "한겨레21"), ("037", "주간동아"), ("044", "코리아헤럴드"),
    ("047", "오마이뉴스"), ("050", "한경비즈니스"), ("052", "YTN"), ("053", "주간조선"),
    ("055", "SBS"), ("056", "KBS"), ("057", "MBN"), ("079", "노컷뉴스"), ("081", "서울신문"),
    ("082", "부산일보"), ("087", "강원일보"), ("088", "매일신문"), ("092", "지디넷코리아"),
    ("094", "월간 산"), ("119", "데일리안"), ("123", "조세일보"), ("127", "기자협회보"),
    ("138", "디지털데일리"), ("145", "레이디경향"), ("214", "MBC"), ("215", "한국경제TV"),
    ("243", "이코노미스트"), ("262", "신동아"), ("277", "아시아경제"), ("293", "블로터"),
    ("296", "코메디닷컴"), ("308", "시사IN"), ("310", "여성신문"), ("346", "헬스조선"),
    ("366", "조선비즈"), ("374", "SBS Biz"), ("417", "동행미디어 시대"), ("421", "뉴스1"),
    ("422", "연합뉴스TV"), ("437", "JTBC"), ("448", "TV조선"), ("449", "채널A"),
    ("469", "한국일보"), ("584", "동아사이언스"), ("586", "시사저널"), ("607", "뉴스타파"),
    ("629", "더팩트"), ("640", "코리아중앙데일리"), ("648", "비즈워치"), ("654", "강원도민일보"),
    ("655", "CJB청주방송"), ("656", "대전일보"), ("657", "대구MBC"), ("658", "국제신문"),
    ("659", "전주MBC"), ("660", "kbc광주방송"), ("661", "JIBS"), ("662", "농민신문"),
    ("665", "더스쿠프"), ("666", "경기일보"),
];

static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

pub struct NaverOpinion {
    renderer: Option<Arc<dyn Renderer>>,
}

impl NaverOpinion {
    pub fn new(renderer: Option<Arc<dyn Renderer>>) -> Self {
        Self { renderer }
    }

    /// Fully scrolled editorial tab, or `None` without a renderer, on failure,
    /// or past the time budget.
    async fn render_editorial_tab(&self, url: &str) -> Option<String> {
        let renderer = self.renderer.as_deref()?;
        let plan = RenderPlan::ScrollUntilStable {
            marker: ARTICLE_MARKER.into(),
            max_rounds: 55,
            stable_rounds: 4,
            click_text: Some("더보기".into()),
            pause: Duration::from_millis(1200),
        };
        match timeout(RENDER_BUDGET, renderer.render(url, &plan)).await {
            Ok(Ok(html)) => Some(html),
            Ok(Err(e)) => {
                debug!(error = %e, "editorial tab render failed");
                None
            }
            Err(_) => {
                debug!(budget_secs = RENDER_BUDGET.as_secs(), "editorial tab render timed out");
                None
            }
        }
    }

    /// Merge the static editorial tab and the section list into `items`.
    async fn supplement(
        &self,
        date: NaiveDate,
        editorial_url: &str,
        items: &mut Vec<Editorial>,
        seen: &mut HashSet<String>,
    ) -> ScrapeResult<()> {
        let fetcher = Fetcher::new(Accept::Html, Some("https://news.naver.com/"), Duration::from_secs(22))?;
        let html = fetcher.get_text(editorial_url).await?;
        for e in parse_editorial_tab(&html, date) {
            if seen.insert(e.url.clone()) {
                items.push(e);
            }
        }
        debug!(count = items.len(), "after static editorial tab");

        for list_type in LIST_TYPES {
            let mut added_any = false;
            for page in 1..=LIST_MAX_PAGES {
                let html = fetcher.get_text(&list_url(list_type, date, page)).await?;
                let extra = parse_section_list(&html, date, seen);
                if extra.is_empty() {
                    break;
                }
                debug!(list_type, page, count = extra.len(), "section list page");
                added_any = true;
                items.extend(extra);
            }
            if added_any {
                break;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SourceAdapter for NaverOpinion {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
        self.fetch_for_date(today()).await
    }

    #[instrument(level = "info", skip(self), fields(source = SOURCE_NAME))]
    async fn fetch_for_date(&self, date: NaiveDate) -> ScrapeResult<Vec<Editorial>> {
        let editorial_url = format!("{EDITORIAL_URL}?date={}", date.format("%Y%m%d"));
        let mut items = Vec::new();
        let mut seen = HashSet::new();

        if let Some(html) = self.render_editorial_tab(&editorial_url).await {
            items = parse_editorial_tab(&html, date);
            seen = items.iter().map(|e| e.url.clone()).collect();
            info!(count = items.len(), "collected from rendered editorial tab");
        }

        let supplement = if items.len() < MIN_RENDERED {
            self.supplement(date, &editorial_url, &mut items, &mut seen).await
        } else {
            Ok(())
        };
        let items = conclude(items, supplement)?;
        info!(count = items.len(), "collected editorials");
        Ok(items)
    }
}

/// Combine what the paths collected with how the static path ended. A
/// static failure is an error only when nothing at all was collected.
fn conclude(items: Vec<Editorial>, supplement: ScrapeResult<()>) -> ScrapeResult<Vec<Editorial>> {
    if let Err(e) = supplement {
        if items.is_empty() {
            return Err(ScrapeError::Exhausted {
                source_name: SOURCE_NAME.to_string(),
                reason: e.to_string(),
            });
        }
        warn!(error = %e, kept = items.len(), "static collection stopped early");
    }
    let mut items = dedup_by_url(items);
    items.truncate(MAX_ITEMS);
    Ok(items)
}

fn list_url(list_type: &str, date: NaiveDate, page: usize) -> String {
    format!(
        "{LIST_URL}?mode=LSD&mid=sec&sid1=110&listType={list_type}&date={}&page={page}",
        date.format("%Y%m%d")
    )
}

/// Absolute article URL, with the opinion section query when the link has none.
fn article_url(href: &str) -> String {
    let mut url = if href.starts_with("http") {
        href.to_string()
    } else {
        let path = href.rsplit("n.news.naver.com").next().unwrap_or(href);
        format!("{ARTICLE_HOST}{path}")
    };
    if !url.contains('?') {
        url.push_str(OPINION_SECTION_QUERY);
    }
    url
}

/// Split "Publisher Title 3시간전" into publisher and title. Either may be
/// empty; a single word serves as both.
fn parse_link_text(text: &str) -> (String, String) {
    let text = strip_time_suffix(text);
    match text.split_once(char::is_whitespace) {
        None if text.is_empty() => (String::new(), String::new()),
        None => (text.clone(), truncate_chars(&text, 120)),
        Some((publisher, rest)) => {
            let title = match rest.trim() {
                "" => truncate_chars(publisher, 120),
                t => t.to_string(),
            };
            (publisher.to_string(), title)
        }
    }
}

fn office_name(url: &str) -> Option<&'static str> {
    let oid = url.split("/mnews/article/").nth(1)?.split('/').next()?;
    OFFICES.iter().find(|(id, _)| *id == oid).map(|(_, name)| *name)
}

/// Publisher named at the end of, or as a word inside, a list entry's text.
fn publisher_in_text(text: &str) -> Option<&'static str> {
    OFFICES
        .iter()
        .map(|(_, name)| *name)
        .find(|name| text.ends_with(name) || text.contains(&format!(" {name} ")))
}

fn has_marker(text: &str) -> bool {
    MARKERS.iter().any(|m| text.contains(m))
}

/// Article links from the editorial tab, which lists only editorials.
pub fn parse_editorial_tab(html: &str, date: NaiveDate) -> Vec<Editorial> {
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for a in doc.select(&LINK) {
        let Some(href) = markup::href(a).filter(|h| h.contains("n.news.naver.com/mnews/article/")) else {
            continue;
        };
        let url = article_url(href);
        if !seen.insert(url.clone()) {
            continue;
        }
        let text = markup::spaced_text(a);
        let (publisher, title) = parse_link_text(&text);
        let title = ensure_title(&text, &title, &MARKERS, MAX_TITLE_CHARS);
        let publisher = if publisher.is_empty() { UNKNOWN_PUBLISHER.to_string() } else { publisher };
        out.push(Editorial::new(publisher, title, url, date));
    }
    out
}

fn list_entry(a: ElementRef<'_>) -> Option<ElementRef<'_>> {
    markup::closest(a, &["li", "dd", "dt"])
}

/// Editorial links from one section-list page not already in `seen`.
pub fn parse_section_list(html: &str, date: NaiveDate, seen: &mut HashSet<String>) -> Vec<Editorial> {
    let doc = Html::parse_document(html);
    let mut out = Vec::new();
    for a in doc.select(&LINK) {
        let Some(href) = markup::href(a).filter(|h| h.contains(ARTICLE_MARKER)) else {
            continue;
        };
        let url = article_url(href);
        if seen.contains(&url) {
            continue;
        }
        let text = markup::spaced_text(a);
        if !has_marker(&text) && !list_entry(a).is_some_and(|p| has_marker(&markup::spaced_text(p))) {
            continue;
        }
        seen.insert(url.clone());
        let stripped = MARKERS
            .iter()
            .fold(text.clone(), |t, m| t.replace(m, "").trim().to_string());
        let title = ensure_title(&text, &stripped, &MARKERS, MAX_TITLE_CHARS);
        let publisher = office_name(&url)
            .or_else(|| list_entry(a).and_then(|p| publisher_in_text(&markup::spaced_text(p))))
            .unwrap_or(OTHER_PUBLISHER);
        out.push(Editorial::new(publisher, title, url, date));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNTITLED;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 12).unwrap()
    }

    #[test]
    fn test_parse_link_text() {
        assert_eq!(
            parse_link_text("조선일보 [사설] 제목입니다 3시간전"),
            ("조선일보".to_string(), "[사설] 제목입니다".to_string())
        );
        assert_eq!(parse_link_text("한겨레"), ("한겨레".to_string(), "한겨레".to_string()));
        assert_eq!(parse_link_text("3시간전"), (String::new(), String::new()));
    }

    #[test]
    fn test_article_url() {
        assert_eq!(
            article_url("https://n.news.naver.com/mnews/article/023/0003912345"),
            "https://n.news.naver.com/mnews/article/023/0003912345?sid=110"
        );
        assert_eq!(
            article_url("/mnews/article/023/0003912345?sid=110"),
            "https://n.news.naver.com/mnews/article/023/0003912345?sid=110"
        );
    }

    #[test]
    fn test_editorial_tab() {
        let html = r#"<ul class="opinion_editorial_list">
          <li><a href="https://n.news.naver.com/mnews/article/023/0003912345">
            <span class="press">조선일보</span><strong>[사설] 첫 사설</strong><span>3시간전</span></a></li>
          <li><a href="https://n.news.naver.com/mnews/article/023/0003912345?sid=110">조선일보 중복</a></li>
          <li><a href="https://n.news.naver.com/mnews/article/028/0002777777"><span>3시간전</span></a></li>
          <li><a href="https://news.naver.com/section/110">섹션</a></li>
        </ul>"#;
        let items = parse_editorial_tab(html, day());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source, "조선일보");
        assert_eq!(items[0].title, "[사설] 첫 사설");
        assert_eq!(items[0].url, "https://n.news.naver.com/mnews/article/023/0003912345?sid=110");
        assert_eq!(items[0].published_date, day());
        assert_eq!(items[1].title, UNTITLED);
        assert_eq!(items[1].source, UNKNOWN_PUBLISHER);
    }

    #[test]
    fn test_section_list_publishers_and_markers() {
        let html = r#"<ul class="type06_headline">
          <li><dl><dt><a href="https://n.news.naver.com/mnews/article/032/0003300001?sid=110">[사설] 경향 사설</a></dt>
            <dd><span class="writing">경향신문</span></dd></dl></li>
          <li><a href="https://n.news.naver.com/mnews/article/999/0000000001?sid=110">지역지 사설 제목</a>
            <span>[논설실의 관점]</span> <span class="writing">경기일보</span></li>
          <li><dl><dt><a href="https://n.news.naver.com/mnews/article/998/0000000002?sid=110">[사설] 출처 불명</a></dt></dl></li>
          <li><dl><dt><a href="https://n.news.naver.com/mnews/article/025/0003400000?sid=110">칼럼 제목</a></dt></dl></li>
        </ul>"#;
        let mut seen = HashSet::new();
        let items = parse_section_list(html, day(), &mut seen);
        let got: Vec<_> = items.iter().map(|e| (e.source.as_str(), e.title.as_str())).collect();
        assert_eq!(
            got,
            vec![("경향신문", "경향 사설"), ("경기일보", "지역지 사설 제목"), (OTHER_PUBLISHER, "출처 불명")]
        );
        assert_eq!(seen.len(), 3);
        assert!(parse_section_list(html, day(), &mut seen).is_empty());
    }

    #[test]
    fn test_list_url() {
        assert_eq!(
            list_url("paper", day(), 2),
            "https://news.naver.com/main/list.naver?mode=LSD&mid=sec&sid1=110&listType=paper&date=20260212&page=2"
        );
    }

    #[tokio::test]
    async fn test_failed_render_falls_through() {
        struct Down;
        #[async_trait]
        impl Renderer for Down {
            async fn render(&self, _url: &str, _plan: &RenderPlan) -> ScrapeResult<String> {
                Err(ScrapeError::RendererUnavailable("down".into()))
            }
        }
        let adapter = NaverOpinion::new(Some(Arc::new(Down)));
        assert!(adapter.render_editorial_tab(EDITORIAL_URL).await.is_none());
        assert!(NaverOpinion::new(None).render_editorial_tab(EDITORIAL_URL).await.is_none());
    }

    fn status_error() -> ScrapeError {
        ScrapeError::Status {
            url: LIST_URL.to_string(),
            status: 503,
        }
    }

    fn rendered(n: usize) -> Vec<Editorial> {
        (0..n)
            .map(|i| Editorial::new("한겨레", format!("[사설] {i}"), format!("{ARTICLE_HOST}/mnews/article/028/{i}"), day()))
            .collect()
    }

    #[test]
    fn test_nothing_collected_and_static_failed_is_exhausted() {
        match conclude(Vec::new(), Err(status_error())) {
            Err(ScrapeError::Exhausted { source_name, reason }) => {
                assert_eq!(source_name, SOURCE_NAME);
                assert!(reason.contains("503"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_static_failure_keeps_collected_items() {
        let mut items = rendered(3);
        items.push(items[0].clone());
        let kept = conclude(items, Err(status_error())).unwrap();
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_empty_day_without_failure_is_ok() {
        assert!(conclude(Vec::new(), Ok(())).unwrap().is_empty());
    }

    #[test]
    fn test_conclude_caps_items() {
        assert_eq!(conclude(rendered(300), Ok(())).unwrap().len(), MAX_ITEMS);
    }
}
