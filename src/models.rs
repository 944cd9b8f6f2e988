//! Data models for collected editorials and the API payloads built from them.
//!
//! - [`Editorial`]: one editorial as extracted from a publisher listing
//! - [`EditorialItem`]: the trimmed, serializable form returned by the API
//! - [`SourceMeta`]: per-adapter outcome of one collection run
//! - [`EditorialsResponse`]: the body of `GET /api/editorials`
//!
//! Records are built fresh for every request and never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used when no usable title text survives extraction.
pub const UNTITLED: &str = "제목 없음";

/// An editorial as scraped from a publisher's listing page or feed.
///
/// `url` is the dedup key within one collection run. `title` is never empty;
/// [`Editorial::new`] substitutes [`UNTITLED`] for blank input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Editorial {
    /// Publisher name, e.g. "조선일보".
    pub source: String,
    /// Headline, usually carrying the "[사설]" marker.
    pub title: String,
    /// Absolute article URL.
    pub url: String,
    /// Listing-level teaser text, when the publisher shows one.
    pub summary: Option<String>,
    /// Article body. Listing scrapers never fill this.
    pub content: Option<String>,
    /// Publication date; serializes as `YYYY-MM-DD`.
    pub published_date: NaiveDate,
}

impl Editorial {
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        published_date: NaiveDate,
    ) -> Self {
        let title = title.into();
        let title = match title.trim() {
            "" => UNTITLED.to_string(),
            t => t.to_string(),
        };
        Self {
            source: source.into(),
            title,
            url: url.into(),
            summary: None,
            content: None,
            published_date,
        }
    }

    /// Attach a summary, dropping it when blank.
    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }
}

/// One entry of the `items` array returned by `/api/editorials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorialItem {
    pub source: String,
    pub title: String,
    pub url: String,
    /// Truncated to the configured character budget; empty when absent.
    pub summary: String,
    pub published_date: NaiveDate,
}

/// Outcome of one adapter within a collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of `GET /api/editorials`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorialsResponse {
    pub total: usize,
    pub date: String,
    pub items: Vec<EditorialItem>,
    pub by_source: BTreeMap<String, SourceMeta>,
    /// Request-level problem (e.g. an unparseable `date`), never an adapter error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EditorialsResponse {
    /// An empty result for `date`, optionally annotated with why it is empty.
    pub fn empty(date: impl Into<String>, error: Option<String>) -> Self {
        Self {
            total: 0,
            date: date.into(),
            items: Vec::new(),
            by_source: BTreeMap::new(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 12).unwrap()
    }

    #[test]
    fn test_blank_title_becomes_placeholder() {
        let e = Editorial::new("한겨레", "   ", "https://example.com/a", day());
        assert_eq!(e.title, UNTITLED);
    }

    #[test]
    fn test_title_is_trimmed() {
        let e = Editorial::new("한겨레", "  [사설] 제목 ", "https://example.com/a", day());
        assert_eq!(e.title, "[사설] 제목");
    }

    #[test]
    fn test_blank_summary_is_dropped() {
        let e = Editorial::new("한겨레", "t", "u", day()).with_summary(Some("  ".into()));
        assert_eq!(e.summary, None);
    }

    #[test]
    fn test_published_date_serializes_as_ymd() {
        let e = Editorial::new("경향신문", "[사설] 제목", "https://example.com/a", day());
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"published_date\":\"2026-02-12\""));
    }

    #[test]
    fn test_source_meta_omits_missing_error() {
        let meta = SourceMeta { count: 3, error: None };
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"count":3}"#);

        let meta = SourceMeta {
            count: 0,
            error: Some("timed out after 90s".into()),
        };
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"error\":\"timed out after 90s\""));
    }

    #[test]
    fn test_empty_response_shape() {
        let resp = EditorialsResponse::empty("2026-02-12", None);
        let v: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["total"], 0);
        assert_eq!(v["date"], "2026-02-12");
        assert!(v["items"].as_array().unwrap().is_empty());
        assert!(v["by_source"].as_object().unwrap().is_empty());
        assert!(v.get("error").is_none());
    }
}
