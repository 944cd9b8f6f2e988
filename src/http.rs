//! HTTP fetching with browser-like headers.
//!
//! Several publishers serve a stub or refuse the request outright when the
//! client does not look like a desktop browser, so every adapter goes through
//! a [`Fetcher`] built here. Each adapter invocation builds its own client;
//! nothing is shared between concurrent adapters.

use crate::error::{ScrapeError, ScrapeResult};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const FEED_ACCEPT: &str =
    "application/rss+xml, application/xml, application/atom+xml, text/xml, */*;q=0.8";
const KO_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

/// What kind of document the request is after; decides the `Accept` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Html,
    Feed,
}

/// Character set of a listing page body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    /// EUC-KR / CP949, still used by a few older Korean CMSes.
    EucKr,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// A client with the full browser header set.
    pub fn new(accept: Accept, referer: Option<&str>, timeout: Duration) -> ScrapeResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(match accept {
                Accept::Html => HTML_ACCEPT,
                Accept::Feed => FEED_ACCEPT,
            }),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(KO_ACCEPT_LANGUAGE));
        if let Some(r) = referer.and_then(|r| HeaderValue::from_str(r).ok()) {
            headers.insert(REFERER, r);
        }
        Self::with_headers(headers, timeout)
    }

    /// A client that only sends a user agent. Some listings answer
    /// differently once `Accept-Language` is present.
    pub fn user_agent_only(timeout: Duration) -> ScrapeResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            ),
        );
        Self::with_headers(headers, timeout)
    }

    fn with_headers(headers: HeaderMap, timeout: Duration) -> ScrapeResult<Self> {
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url`, failing on transport errors and non-2xx statuses.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_text(&self, url: &str) -> ScrapeResult<String> {
        self.get_decoded(url, Charset::Utf8).await
    }

    /// GET `url` and decode the body with the given charset.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_decoded(&self, url: &str, charset: Charset) -> ScrapeResult<String> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = match charset {
            Charset::Utf8 => resp.text().await?,
            Charset::EucKr => decode_euc_kr(&resp.bytes().await?),
        };
        debug!(bytes = body.len(), "fetched");
        Ok(body)
    }

    /// GET `url` returning the body only for a 200 with non-blank content.
    /// Used for optional feeds where any failure means "try the next path".
    pub async fn get_optional(&self, url: &str) -> Option<String> {
        match self.get_text(url).await {
            Ok(body) if !body.trim().is_empty() => Some(body),
            Ok(_) => None,
            Err(e) => {
                debug!(%url, error = %e, "optional fetch failed");
                None
            }
        }
    }
}

/// Decode an EUC-KR body. `encoding_rs` maps the label to its CP949
/// superset, so extended hangul decodes too; malformed sequences become U+FFFD.
pub fn decode_euc_kr(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::EUC_KR.decode(bytes);
    text.into_owned()
}
