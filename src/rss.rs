//! RSS 2.0 and Atom parsing into [`Editorial`] records.
//!
//! The parser streams events with `quick_xml` and matches elements by local
//! name, so `<atom:entry>` and `<entry xmlns="…">` are treated alike. Only the
//! first `title`/`link`/`pubDate`/`description`/`updated` child of an item is
//! kept; later duplicates such as `media:title` are ignored.

use crate::error::{ScrapeError, ScrapeResult};
use crate::http::Fetcher;
use crate::models::Editorial;
use crate::utils::ymd;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::borrow::Cow;
use tracing::{debug, instrument, warn};

static ISO_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemKind {
    Rss,
    Atom,
}

#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Date,
    Description,
}

struct OpenItem {
    kind: ItemKind,
    depth: usize,
    raw: RawItem,
    field: Option<(Field, String)>,
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn href_attr(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"href")
        .and_then(|a| a.unescape_value().ok().map(Cow::into_owned))
}

fn field_for(kind: ItemKind, name: &str) -> Option<Field> {
    match (kind, name) {
        (_, "title") => Some(Field::Title),
        (_, "link") => Some(Field::Link),
        (ItemKind::Rss, "pubDate") => Some(Field::Date),
        (ItemKind::Rss, "description") => Some(Field::Description),
        (ItemKind::Atom, "updated") => Some(Field::Date),
        _ => None,
    }
}

impl RawItem {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Date => &mut self.date,
            Field::Description => &mut self.description,
        }
    }
}

/// Replace HTML-only entities that make strict XML unescaping fail.
fn scrub_entities(s: &str) -> String {
    s.trim_start_matches('\u{FEFF}')
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&middot;", "&#183;")
        .replace("&hellip;", "&#8230;")
}

/// Convert a feed date to a calendar date.
///
/// Accepts an ISO-8601 prefix (`2026-02-12…`) or RFC 2822
/// (`Thu, 12 Feb 2026 05:00:00 +0900`, date taken in the stamp's own offset).
/// Blank or unparseable input falls back to `today`.
pub fn feed_date(raw: &str, today: NaiveDate) -> NaiveDate {
    let raw = raw.trim();
    if raw.is_empty() {
        return today;
    }
    if let Some(c) = ISO_PREFIX.captures(raw) {
        if let Some(d) = ymd(&c[1], &c[2], &c[3]) {
            return d;
        }
    }
    match DateTime::parse_from_rfc2822(raw) {
        Ok(dt) => dt.date_naive(),
        Err(_) => {
            debug!(%raw, "unparseable feed date, using today");
            today
        }
    }
}

/// Parse an RSS 2.0 (`channel/item`) or Atom (`feed/entry`) document.
///
/// When the document has an RSS `channel`, only its items are returned even
/// if that list is empty. Items missing a title or link are skipped.
pub fn parse_feed(xml: &str, source_name: &str, today: NaiveDate) -> ScrapeResult<Vec<Editorial>> {
    let cleaned = scrub_entities(xml);
    let mut reader = Reader::from_str(&cleaned);

    let mut stack: Vec<String> = Vec::new();
    let mut saw_channel = false;
    let mut open: Option<OpenItem> = None;
    let mut rss_items = Vec::new();
    let mut atom_items = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ScrapeError::Feed(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                let parent_is_channel = stack.last().is_some_and(|p| p == "channel");
                if open.is_none() {
                    let kind = match name.as_str() {
                        "item" if parent_is_channel => Some(ItemKind::Rss),
                        "entry" => Some(ItemKind::Atom),
                        "channel" => {
                            saw_channel = true;
                            None
                        }
                        _ => None,
                    };
                    if let Some(kind) = kind {
                        open = Some(OpenItem {
                            kind,
                            depth: stack.len() + 1,
                            raw: RawItem::default(),
                            field: None,
                        });
                    }
                } else if let Some(item) = open.as_mut() {
                    if stack.len() == item.depth && item.field.is_none() {
                        if let Some(field) = field_for(item.kind, &name) {
                            let seed = match (item.kind, field) {
                                (ItemKind::Atom, Field::Link) => href_attr(&e).unwrap_or_default(),
                                _ => String::new(),
                            };
                            item.field = Some((field, seed));
                        }
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if let Some(item) = open.as_mut() {
                    if item.kind == ItemKind::Atom
                        && stack.len() == item.depth
                        && local_name(&e) == "link"
                        && item.raw.link.is_none()
                    {
                        item.raw.link = href_attr(&e);
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, buf)) = open.as_mut().and_then(|i| i.field.as_mut()) {
                    match t.unescape() {
                        Ok(s) => buf.push_str(&s),
                        Err(_) => buf.push_str(&String::from_utf8_lossy(t.as_ref())),
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, buf)) = open.as_mut().and_then(|i| i.field.as_mut()) {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                let depth = stack.len();
                stack.pop();
                let Some(item) = open.as_mut() else { continue };
                if depth == item.depth + 1 {
                    if let Some((field, text)) = item.field.take() {
                        let slot = item.raw.slot(field);
                        if slot.is_none() {
                            *slot = Some(text);
                        }
                    }
                } else if depth == item.depth {
                    if let Some(done) = open.take() {
                        let bucket = match done.kind {
                            ItemKind::Rss => &mut rss_items,
                            ItemKind::Atom => &mut atom_items,
                        };
                        bucket.push((done.kind, done.raw));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let chosen = if saw_channel { rss_items } else { atom_items };
    Ok(chosen
        .into_iter()
        .filter_map(|(kind, raw)| into_editorial(kind, raw, source_name, today))
        .collect())
}

fn into_editorial(kind: ItemKind, raw: RawItem, source_name: &str, today: NaiveDate) -> Option<Editorial> {
    let title = raw.title.as_deref().map(str::trim).unwrap_or_default();
    let link = raw.link.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() || link.is_empty() {
        return None;
    }
    let date = feed_date(raw.date.as_deref().unwrap_or_default(), today);
    let summary = match kind {
        ItemKind::Rss => raw.description,
        ItemKind::Atom => None,
    };
    Some(Editorial::new(source_name, title, link, date).with_summary(summary))
}

/// Fetch and parse a feed. A malformed body is logged and yields no records.
#[instrument(level = "info", skip(fetcher))]
pub async fn fetch_feed(
    fetcher: &Fetcher,
    url: &str,
    source_name: &str,
    today: NaiveDate,
) -> ScrapeResult<Vec<Editorial>> {
    let body = fetcher.get_text(url).await?;
    match parse_feed(&body, source_name, today) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!(error = %e, "feed did not parse");
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, dd).unwrap()
    }

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Opinion</title>
    <link>https://www.example.com/opinion</link>
    <item>
      <title><![CDATA[[사설] 첫 번째 사설]]></title>
      <link>https://www.chosun.com/opinion/editorial/2026/02/12/ABC/</link>
      <pubDate>Thu, 12 Feb 2026 05:00:00 +0900</pubDate>
      <description>요약 &amp; 본문&nbsp;일부</description>
      <media:title>ignored</media:title>
    </item>
    <item>
      <title>Column without link</title>
    </item>
    <item>
      <title>Second</title>
      <link>https://www.example.com/2</link>
      <pubDate>2026-02-11T22:00:00Z</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Feed</title>
  <link href="https://www.example.com/"/>
  <entry>
    <title>Atom one</title>
    <link rel="alternate" href="https://www.example.com/a1"/>
    <updated>2026-02-10T08:00:00+09:00</updated>
    <summary>not used</summary>
  </entry>
  <entry>
    <title>Atom two</title>
    <link>https://www.example.com/a2</link>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_items() {
        let items = parse_feed(RSS, "조선일보", d(2026, 2, 20)).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "[사설] 첫 번째 사설");
        assert_eq!(items[0].published_date, d(2026, 2, 12));
        assert_eq!(items[0].summary.as_deref(), Some("요약 & 본문\u{a0}일부"));
        assert_eq!(items[0].source, "조선일보");
        assert_eq!(items[1].published_date, d(2026, 2, 11));
        assert_eq!(items[1].summary, None);
    }

    #[test]
    fn test_parse_atom_entries() {
        let today = d(2026, 2, 20);
        let items = parse_feed(ATOM, "Feed", today).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://www.example.com/a1");
        assert_eq!(items[0].published_date, d(2026, 2, 10));
        assert_eq!(items[0].summary, None);
        assert_eq!(items[1].url, "https://www.example.com/a2");
        assert_eq!(items[1].published_date, today);
    }

    #[test]
    fn test_prefixed_atom_namespace() {
        let xml = r#"<a:feed xmlns:a="http://www.w3.org/2005/Atom">
            <a:entry><a:title>T</a:title><a:link href="https://x.kr/1"/><a:updated>2026-01-02</a:updated></a:entry>
        </a:feed>"#;
        let items = parse_feed(xml, "X", d(2026, 2, 20)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].published_date, d(2026, 1, 2));
    }

    #[test]
    fn test_malformed_feed_is_an_error() {
        assert!(parse_feed("<rss><channel><item></channel></rss>", "X", d(2026, 2, 20)).is_err());
    }

    #[test]
    fn test_feed_date_fallbacks() {
        let today = d(2026, 2, 20);
        assert_eq!(feed_date("", today), today);
        assert_eq!(feed_date("next tuesday", today), today);
        assert_eq!(feed_date("2026-02-03T00:00:00Z", today), d(2026, 2, 3));
        assert_eq!(feed_date("Tue, 03 Feb 2026 23:30:00 -0500", today), d(2026, 2, 3));
    }
}
