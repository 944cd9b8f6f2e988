//! Concurrent collection across the registered adapters.
//!
//! Each selected adapter runs as its own tokio task under a wall-clock
//! timeout. A failure, timeout, or panic in one adapter becomes an error
//! annotation in `by_source` and never affects the others. The merged items
//! are sorted by `(source, title)` so output order does not depend on which
//! adapter finished first.

use crate::models::{Editorial, EditorialItem, EditorialsResponse, SourceMeta};
use crate::scrapers::Registry;
use crate::utils::truncate_chars;
use chrono::NaiveDate;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Longest error text kept in a `by_source` annotation.
const MAX_ERROR_CHARS: usize = 200;

/// Run every adapter matching `source` for `date` and merge the results.
#[instrument(level = "info", skip(registry))]
pub async fn collect(
    registry: &Registry,
    date: NaiveDate,
    source: Option<&str>,
    timeout: Duration,
    summary_chars: usize,
) -> EditorialsResponse {
    let adapters = registry.select(source);

    let names: Vec<String> = adapters.iter().map(|a| a.source_name().to_string()).collect();
    let handles = adapters.into_iter().map(|adapter| {
        tokio::spawn(async move { tokio::time::timeout(timeout, adapter.fetch_for_date(date)).await })
    });
    let joined = join_all(handles).await;

    let mut records: Vec<Editorial> = Vec::new();
    let mut by_source = BTreeMap::new();
    for (name, joined) in names.into_iter().zip(joined) {
        let outcome = match joined {
            Ok(Ok(Ok(items))) => Ok(items),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(_)) => Err(format!("timed out after {}s", timeout.as_secs())),
            Err(e) => Err(format!("task failed: {e}")),
        };
        let meta = match outcome {
            Ok(items) => {
                info!(source = %name, count = items.len(), "adapter finished");
                let meta = SourceMeta { count: items.len(), error: None };
                records.extend(items);
                meta
            }
            Err(err) => {
                warn!(source = %name, error = %err, "adapter failed");
                SourceMeta {
                    count: 0,
                    error: Some(truncate_chars(&err, MAX_ERROR_CHARS)),
                }
            }
        };
        by_source.insert(name, meta);
    }

    let items = merge(records, summary_chars);
    info!(total = items.len(), sources = by_source.len(), "collection finished");
    EditorialsResponse {
        total: items.len(),
        date: date.to_string(),
        items,
        by_source,
        error: None,
    }
}

/// Trim each record to its API form and impose the `(source, title)` order.
fn merge(records: Vec<Editorial>, summary_chars: usize) -> Vec<EditorialItem> {
    let mut items: Vec<EditorialItem> = records
        .into_iter()
        .map(|e| EditorialItem {
            summary: e
                .summary
                .as_deref()
                .map(|s| truncate_chars(s, summary_chars))
                .unwrap_or_default(),
            source: e.source,
            title: e.title,
            url: e.url,
            published_date: e.published_date,
        })
        .collect();
    items.sort_by(|a, b| (&a.source, &a.title).cmp(&(&b.source, &b.title)));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ScrapeError, ScrapeResult};
    use crate::scrapers::SourceAdapter;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 12).unwrap()
    }

    struct Fixed(&'static str, Vec<Editorial>);

    #[async_trait]
    impl SourceAdapter for Fixed {
        fn source_name(&self) -> &str {
            self.0
        }
        async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
            Ok(self.1.clone())
        }
    }

    struct Slow;

    #[async_trait]
    impl SourceAdapter for Slow {
        fn source_name(&self) -> &str {
            "Slow"
        }
        async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Vec::new())
        }
    }

    struct Failing;

    #[async_trait]
    impl SourceAdapter for Failing {
        fn source_name(&self) -> &str {
            "Failing"
        }
        async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
            Err(ScrapeError::Exhausted {
                source_name: "Failing".into(),
                reason: "x".repeat(500),
            })
        }
    }

    fn rec(source: &str, title: &str) -> Editorial {
        Editorial::new(source, title, format!("https://example.com/{source}/{title}"), day())
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let registry = Registry::new(vec![
            Arc::new(Slow),
            Arc::new(Failing),
            Arc::new(Fixed("A", vec![rec("A", "x")])),
        ]);
        let resp = collect(&registry, day(), None, Duration::from_millis(100), 300).await;

        assert_eq!(resp.total, 1);
        assert_eq!(resp.date, "2026-02-12");
        assert_eq!(resp.by_source["A"], SourceMeta { count: 1, error: None });

        let slow = &resp.by_source["Slow"];
        assert_eq!(slow.count, 0);
        assert!(slow.error.as_deref().is_some_and(|e| e.starts_with("timed out after")));

        let failing = &resp.by_source["Failing"];
        assert_eq!(failing.count, 0);
        assert_eq!(failing.error.as_ref().map(|e| e.chars().count()), Some(MAX_ERROR_CHARS));
    }

    #[tokio::test]
    async fn test_sorted_by_source_then_title() {
        let registry = Registry::new(vec![
            Arc::new(Fixed("B", vec![rec("B", "x")])),
            Arc::new(Fixed("A", vec![rec("A", "y"), rec("A", "x")])),
        ]);
        let resp = collect(&registry, day(), None, Duration::from_secs(5), 300).await;
        let order: Vec<_> = resp.items.iter().map(|i| (i.source.as_str(), i.title.as_str())).collect();
        assert_eq!(order, vec![("A", "x"), ("A", "y"), ("B", "x")]);
    }

    #[tokio::test]
    async fn test_source_filter_and_unknown_source() {
        let registry = Registry::new(vec![
            Arc::new(Fixed("A", vec![rec("A", "x")])),
            Arc::new(Fixed("B", vec![rec("B", "x")])),
        ]);
        let resp = collect(&registry, day(), Some("B"), Duration::from_secs(5), 300).await;
        assert_eq!(resp.total, 1);
        assert_eq!(resp.by_source.keys().collect::<Vec<_>>(), vec!["B"]);

        let resp = collect(&registry, day(), Some("없는신문"), Duration::from_secs(5), 300).await;
        assert_eq!(resp.total, 0);
        assert!(resp.by_source.is_empty());
    }

    #[tokio::test]
    async fn test_other_dates_are_filtered_out() {
        let stale = Editorial::new("A", "old", "https://example.com/old", day().pred_opt().unwrap());
        let registry = Registry::new(vec![Arc::new(Fixed("A", vec![rec("A", "x"), stale]))]);
        let resp = collect(&registry, day(), None, Duration::from_secs(5), 300).await;
        assert_eq!(resp.total, 1);
        assert_eq!(resp.items[0].title, "x");
    }

    #[test]
    fn test_summary_truncation() {
        let long = rec("A", "x").with_summary(Some("가".repeat(500)));
        let none = rec("A", "y");
        let items = merge(vec![long, none], 300);
        assert_eq!(items[0].summary.chars().count(), 300);
        assert_eq!(items[1].summary, "");
        let json = serde_json::to_value(&items[1]).unwrap();
        assert_eq!(json["summary"], "");
    }
}
