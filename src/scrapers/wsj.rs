//! Wall Street Journal opinion, from the public Dow Jones RSS feed.
//!
//! The feed lags the print edition, so a date request also accepts items
//! stamped the day before.

use super::{SourceAdapter, finish};
use crate::error::ScrapeResult;
use crate::http::{Accept, Fetcher};
use crate::models::Editorial;
use crate::rss;
use crate::utils::today;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const SOURCE_NAME: &str = "Wall Street Journal";

const FEED_URL: &str = "https://feeds.content.dowjones.io/public/rss/RSSOpinion";
const MAX_ITEMS: usize = 80;

pub struct Wsj;

#[async_trait]
impl SourceAdapter for Wsj {
    fn source_name(&self) -> &str {
        SOURCE_NAME
    }

    #[instrument(level = "info", skip_all, fields(source = SOURCE_NAME))]
    async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
        let fetcher = Fetcher::new(Accept::Feed, None, Duration::from_secs(25))?;
        let items = match rss::fetch_feed(&fetcher, FEED_URL, SOURCE_NAME, today()).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "opinion feed fetch failed");
                Vec::new()
            }
        };
        info!(count = items.len(), "collected from feed");
        Ok(finish(items, MAX_ITEMS))
    }

    async fn fetch_for_date(&self, date: NaiveDate) -> ScrapeResult<Vec<Editorial>> {
        Ok(within_lookback(self.fetch_latest().await?, date))
    }
}

/// Keep items dated `date` or the day before.
fn within_lookback(items: Vec<Editorial>, date: NaiveDate) -> Vec<Editorial> {
    let prev = date.checked_sub_days(Days::new(1));
    items
        .into_iter()
        .filter(|e| e.published_date == date || Some(e.published_date) == prev)
        .collect()
}
