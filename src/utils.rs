//! Text, date, and URL helpers shared by the publisher adapters.
//!
//! Nothing in here knows about any particular site. The adapters decide which
//! of these heuristics apply to their markup and in what order.

use crate::models::{Editorial, UNTITLED};
use chrono::{Local, NaiveDate};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::path::Path;
use tracing::debug;
use url::Url;

/// Bracketed tag Korean outlets put on institutional editorials.
pub const EDITORIAL_MARKER: &str = "[사설]";

static DASHED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap());
static DOTTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})\.(\d{2})\.(\d{2})").unwrap());
static COMPACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4})(\d{2})(\d{2})").unwrap());
static MONTH_DAY_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2})\.(\d{2})\s+(\d{4})").unwrap());
static TIME_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\d+(시간|분|일)전\s*$").unwrap());

/// Shapes a publish date takes in listing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `2026-02-12`
    Dashed,
    /// `2026.02.12`
    Dotted,
    /// `20260212`, also matches inside longer digit runs
    Compact,
    /// `02.12 2026`
    MonthDayYear,
}

impl DateFormat {
    fn find(self, text: &str) -> Option<NaiveDate> {
        let (re, order): (&Regex, [usize; 3]) = match self {
            DateFormat::Dashed => (&*DASHED, [1, 2, 3]),
            DateFormat::Dotted => (&*DOTTED, [1, 2, 3]),
            DateFormat::Compact => (&*COMPACT, [1, 2, 3]),
            DateFormat::MonthDayYear => (&*MONTH_DAY_YEAR, [3, 1, 2]),
        };
        re.captures_iter(text)
            .find_map(|c| ymd(&c[order[0]], &c[order[1]], &c[order[2]]))
    }
}

/// Current server-local calendar date.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Build a date from year/month/day digit strings, rejecting impossible dates.
pub fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Interpret the first eight characters of `digits` as `YYYYMMDD`.
pub fn compact_date(digits: &str) -> Option<NaiveDate> {
    let d = digits.get(..8)?;
    if !d.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    ymd(&d[..4], &d[4..6], &d[6..8])
}

/// First date found in `text`, trying each format in order.
///
/// A format only wins if one of its matches is a real calendar date;
/// otherwise the next format is tried.
pub fn find_date_in_text(text: &str, formats: &[DateFormat]) -> Option<NaiveDate> {
    formats.iter().find_map(|f| f.find(text))
}

/// Parse a `YYYY-MM-DD` request parameter.
pub fn parse_ymd(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Resolve `href` against the page it appeared on. Script links yield `None`.
pub fn resolve_url(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript") || href.starts_with('#') {
        return None;
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// Drop the query string and fragment, leaving the dedup key for most sites.
pub fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Drop only the fragment; for sites whose article id lives in the query.
pub fn strip_fragment(url: &str) -> &str {
    url.split('#').next().unwrap_or(url)
}

/// Prefix the editorial marker unless the title already starts with it.
pub fn with_marker_prefix(title: &str) -> String {
    let t = title.trim_start();
    if t.starts_with(EDITORIAL_MARKER) {
        t.to_string()
    } else {
        format!("{EDITORIAL_MARKER} {t}")
    }
}

/// Remove a trailing relative-time suffix such as "3시간전" or "15분전".
pub fn strip_time_suffix(s: &str) -> String {
    TIME_SUFFIX.replace(s.trim(), "").trim().to_string()
}

/// Title fallback chain: the normalized title if non-empty, else the raw
/// link text with time suffix and markers removed, else [`UNTITLED`].
/// Both candidates are cut to `max_chars`.
pub fn ensure_title(raw: &str, normalized: &str, markers: &[&str], max_chars: usize) -> String {
    let s = normalized.trim();
    if !s.is_empty() {
        return truncate_chars(s, max_chars);
    }
    let mut s = strip_time_suffix(raw);
    for m in markers {
        s = s.replace(m, "").trim().to_string();
    }
    if !s.is_empty() {
        return truncate_chars(&s, max_chars);
    }
    UNTITLED.to_string()
}

/// Keep at most `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Number of characters (not bytes).
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Collapse records sharing a URL, keeping the first occurrence in order.
pub fn dedup_by_url(items: Vec<Editorial>) -> Vec<Editorial> {
    items.into_iter().unique_by(|e| e.url.clone()).collect()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with a byte count indicator
/// appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Create `path` if needed and prove a file can be written into it.
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    tokio::fs::create_dir_all(path).await?;
    let marker = Path::new(path).join(".__write_check__");
    tokio::fs::write(&marker, b"").await?;
    let _ = tokio::fs::remove_file(&marker).await;
    debug!(%path, "Output directory is writable");
    Ok(())
}
