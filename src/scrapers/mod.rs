//! Per-publisher editorial adapters.
//!
//! Every adapter implements [`SourceAdapter`]: given a date, return that
//! day's editorials from one publisher, best-effort. Each one is tuned to a
//! single site's current markup and shares nothing with the others beyond the
//! helpers in [`markup`], [`crate::utils`], and [`walk_pages`].
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | 조선일보 | [`chosun`] | RSS, then HTML | date in URL path; renderer optional |
//! | 중앙일보 | [`joongang`] | HTML | date from listing text; renderer when page 1 is empty |
//! | 동아일보 | [`donga`] | HTML | mobile listing first; renderer optional |
//! | 한겨레 | [`hani`] | HTML | listing teaser kept as summary |
//! | 경향신문 | [`khan`] | HTML | date in article id |
//! | 한국경제신문 | [`hankyung`] | HTML | block scan for the marker |
//! | 매일경제 | [`mk`] | HTML | date from listing text |
//! | 국민일보 | [`kmib`] | HTML | marker in title or block |
//! | 서울신문 | [`seoul`] | HTML | date in URL path |
//! | 국제신문 | [`kookje`] | HTML (EUC-KR) | date in `key=` |
//! | 부산일보 | [`busan`] | HTML | date in `code=`; path-segment paging |
//! | Wall Street Journal | [`wsj`] | RSS | accepts the previous day too |
//! | 네이버 오피니언 | [`naver`] | aggregator | every publisher at once; opt-in |
//!
//! # Failure Semantics
//!
//! Page fetch errors are swallowed: a failed first page yields an empty list,
//! a failed later page ends the walk with what was collected so far. Only the
//! aggregator reports an error, and only when every path came back empty.

pub mod busan;
pub mod chosun;
pub mod donga;
pub mod hani;
pub mod hankyung;
pub mod joongang;
pub mod khan;
pub mod kmib;
pub mod kookje;
pub mod markup;
pub mod mk;
pub mod naver;
pub mod seoul;
pub mod wsj;

use crate::config::Settings;
use crate::error::ScrapeResult;
use crate::http::{Charset, Fetcher};
use crate::models::Editorial;
use crate::render::{RenderPlan, Renderer};
use crate::utils::dedup_by_url;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A named, stateless editorial source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Name exposed by `/api/sources` and matched by the `source` filter.
    fn source_name(&self) -> &str;

    /// Everything currently on the listing, any date, newest first.
    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>>;

    /// Only the editorials published on `date`.
    async fn fetch_for_date(&self, date: NaiveDate) -> ScrapeResult<Vec<Editorial>> {
        let all = self.fetch_latest().await?;
        Ok(all.into_iter().filter(|e| e.published_date == date).collect())
    }
}

/// How a listing addresses pages after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    /// Page number in a query parameter, e.g. `?page=2`.
    Query(&'static str),
    /// Page number as a trailing path segment, e.g. `/opinionmain/2/`.
    PathSegment,
}

/// Where a publisher's listing lives and how far to walk it.
#[derive(Debug, Clone, Copy)]
pub struct Listing {
    pub url: &'static str,
    pub paging: Paging,
    pub max_pages: usize,
    pub max_items: usize,
}

impl Listing {
    /// Listing URL for 1-based `page`.
    pub fn page_url(&self, page: usize) -> String {
        match self.paging {
            Paging::Query(param) if page > 1 => {
                let sep = if self.url.contains('?') { '&' } else { '?' };
                format!("{}{sep}{param}={page}", self.url)
            }
            Paging::Query(_) => self.url.to_string(),
            Paging::PathSegment => {
                let root = self.url.trim_end_matches('/');
                if page > 1 {
                    format!("{root}/{page}/")
                } else {
                    format!("{root}/")
                }
            }
        }
    }
}

/// Walk listing pages newest-first, collecting records.
///
/// `fetch_page(n)` returns `None` when page `n` could not be fetched; page 1
/// failing yields nothing, a later failure stops the walk. With a `target`
/// date only matching records are kept, and the walk stops after the first
/// page that shows anything older than the target. The result is
/// deduplicated by URL.
pub async fn walk_pages<F, Fut>(max_pages: usize, target: Option<NaiveDate>, mut fetch_page: F) -> Vec<Editorial>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Option<Vec<Editorial>>>,
{
    let mut results = Vec::new();
    for page in 1..=max_pages {
        let Some(records) = fetch_page(page).await else {
            if page == 1 {
                return Vec::new();
            }
            debug!(page, "page fetch failed; keeping partial results");
            break;
        };
        debug!(page, count = records.len(), "parsed listing page");
        let Some(target) = target else {
            results.extend(records);
            continue;
        };
        let mut passed_target = false;
        for e in records {
            if e.published_date < target {
                passed_target = true;
            } else if e.published_date == target {
                results.push(e);
            }
        }
        if passed_target {
            debug!(page, %target, "listing passed target date");
            break;
        }
    }
    dedup_by_url(results)
}

/// Fetch a listing page through the renderer when one is configured, falling
/// back to a static fetch when it is absent, fails, or returns nothing.
pub async fn render_or_fetch(
    renderer: Option<&dyn Renderer>,
    plan: &RenderPlan,
    fetcher: &Fetcher,
    url: &str,
) -> Option<String> {
    if let Some(r) = renderer {
        match r.render(url, plan).await {
            Ok(html) if !html.trim().is_empty() => return Some(html),
            Ok(_) => debug!(%url, "renderer returned an empty document"),
            Err(e) => debug!(%url, error = %e, "render failed; using static fetch"),
        }
    }
    fetcher.get_optional(url).await
}

/// Walk a server-rendered listing with one client, parsing each page body
/// with `parse`, then dedup and cap.
pub async fn walk_static(
    fetcher: &Fetcher,
    listing: &Listing,
    charset: Charset,
    parse: fn(&str) -> Vec<Editorial>,
) -> Vec<Editorial> {
    let items = walk_pages(listing.max_pages, None, move |page| async move {
        let url = listing.page_url(page);
        match fetcher.get_decoded(&url, charset).await {
            Ok(html) => Some(parse(&html)),
            Err(e) => {
                warn!(%url, error = %e, "listing page fetch failed");
                None
            }
        }
    })
    .await;
    finish(items, listing.max_items)
}

/// Dedup and cap an adapter's full listing.
pub fn finish(items: Vec<Editorial>, max_items: usize) -> Vec<Editorial> {
    let mut items = dedup_by_url(items);
    items.truncate(max_items);
    items
}

/// Ordered allow-list of adapters surfaced to callers.
#[derive(Clone, Default)]
pub struct Registry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl Registry {
    pub fn new(adapters: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self { adapters }
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.iter().map(|a| a.source_name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.iter().any(|a| a.source_name() == name)
    }

    /// Adapters matching `source`, or all of them when no filter is given.
    pub fn select(&self, source: Option<&str>) -> Vec<Arc<dyn SourceAdapter>> {
        self.adapters
            .iter()
            .filter(|a| source.is_none_or(|s| a.source_name() == s))
            .cloned()
            .collect()
    }
}

/// Every adapter this crate knows, in presentation order.
pub fn all_adapters(renderer: Option<Arc<dyn Renderer>>) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(chosun::Chosun::new(renderer.clone())),
        Arc::new(joongang::Joongang::new(renderer.clone())),
        Arc::new(donga::Donga::new(renderer.clone())),
        Arc::new(hani::Hani),
        Arc::new(khan::Khan),
        Arc::new(hankyung::Hankyung),
        Arc::new(mk::Mk),
        Arc::new(kmib::Kmib),
        Arc::new(seoul::Seoul),
        Arc::new(kookje::Kookje),
        Arc::new(busan::Busan),
        Arc::new(wsj::Wsj),
        Arc::new(naver::NaverOpinion::new(renderer)),
    ]
}

/// Build the registry from settings: an explicit `sources` list wins;
/// otherwise every publisher adapter, plus the aggregator when enabled.
pub fn build_registry(settings: &Settings, renderer: Option<Arc<dyn Renderer>>) -> Registry {
    let adapters: Vec<_> = all_adapters(renderer)
        .into_iter()
        .filter(|a| match &settings.sources {
            Some(names) => names.iter().any(|n| n == a.source_name()),
            None => settings.include_aggregator || a.source_name() != naver::SOURCE_NAME,
        })
        .collect();
    if let Some(names) = &settings.sources {
        for n in names {
            if !adapters.iter().any(|a| a.source_name() == n) {
                warn!(source = %n, "configured source has no adapter; ignoring");
            }
        }
    }
    let registry = Registry::new(adapters);
    info!(count = registry.len(), sources = %registry.names().join(", "), "Registered editorial adapters");
    registry
}
