//! Optional headless rendering for listings that load their links by script.
//!
//! Adapters hold an `Option<Arc<dyn Renderer>>`. When it is `None`, or when
//! rendering fails, they fall back to a plain fetch. The one implementation
//! shipped here drives a W3C WebDriver endpoint (chromedriver, geckodriver,
//! or a Selenium grid) through `fantoccini`.
//!
//! # Plans
//!
//! | Plan | Used by | Behaviour |
//! |------|---------|-----------|
//! | [`RenderPlan::Settle`] | 조선일보, 동아일보, 중앙일보 | load, optionally wait for a selector, pause, scroll once |
//! | [`RenderPlan::ScrollUntilStable`] | 네이버 오피니언 | scroll repeatedly until the marker count stops growing |

use crate::error::{ScrapeError, ScrapeResult};
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};
use url::Url;

#[derive(Debug, Clone)]
pub enum RenderPlan {
    Settle {
        /// CSS selector to wait for before taking the snapshot.
        wait_for: Option<String>,
        wait_timeout: Duration,
        /// Pause after load (and after the selector appears).
        settle: Duration,
    },
    ScrollUntilStable {
        /// Substring counted in the page source after each scroll.
        marker: String,
        max_rounds: usize,
        /// Consecutive unchanged counts needed to stop.
        stable_rounds: usize,
        /// Text of a "load more" control to click after each scroll.
        click_text: Option<String>,
        pause: Duration,
    },
}

/// Render `url` in a real browser and return the resulting document.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, plan: &RenderPlan) -> ScrapeResult<String>;
}

/// The handful of page operations the render plans need.
#[async_trait]
pub trait BrowserPage: Send {
    async fn scroll_to_bottom(&mut self) -> ScrapeResult<()>;
    /// Click the first link or button whose text is `text`. `Ok(false)` when none.
    async fn click_text(&mut self, text: &str) -> ScrapeResult<bool>;
    async fn has_selector(&mut self, selector: &str) -> ScrapeResult<bool>;
    async fn content(&mut self) -> ScrapeResult<String>;
}

/// Scroll until the number of `marker` occurrences has stayed the same for
/// `stable_rounds` consecutive rounds, or `max_rounds` is hit. A count of
/// zero never counts as stable, so an empty page scrolls to the cap.
pub async fn scroll_until_stable<P: BrowserPage + ?Sized>(
    page: &mut P,
    marker: &str,
    max_rounds: usize,
    stable_rounds: usize,
    click_text: Option<&str>,
    pause: Duration,
) -> ScrapeResult<String> {
    let mut last_count = 0usize;
    let mut stable = 0usize;
    for round in 0..max_rounds {
        page.scroll_to_bottom().await?;
        sleep(pause).await;
        if let Some(text) = click_text {
            match page.click_text(text).await {
                Ok(true) => sleep(pause).await,
                Ok(false) => {}
                Err(e) => debug!(error = %e, "load-more click failed"),
            }
        }
        let count = page.content().await?.matches(marker).count();
        if count > 0 && count == last_count {
            stable += 1;
            if stable >= stable_rounds {
                debug!(round, count, "marker count stable");
                break;
            }
        } else {
            stable = 0;
        }
        last_count = count;
    }
    page.content().await
}

async fn settle<P: BrowserPage + ?Sized>(
    page: &mut P,
    wait_for: Option<&str>,
    wait_timeout: Duration,
    pause: Duration,
) -> ScrapeResult<String> {
    if let Some(selector) = wait_for {
        let deadline = Instant::now() + wait_timeout;
        while Instant::now() < deadline {
            if page.has_selector(selector).await.unwrap_or(false) {
                break;
            }
            sleep(Duration::from_millis(250)).await;
        }
    }
    sleep(pause).await;
    page.scroll_to_bottom().await?;
    sleep(Duration::from_secs(1)).await;
    page.content().await
}

/// Execute `plan` against an already-navigated page.
pub async fn run_plan<P: BrowserPage + ?Sized>(page: &mut P, plan: &RenderPlan) -> ScrapeResult<String> {
    match plan {
        RenderPlan::Settle {
            wait_for,
            wait_timeout,
            settle: pause,
        } => settle(page, wait_for.as_deref(), *wait_timeout, *pause).await,
        RenderPlan::ScrollUntilStable {
            marker,
            max_rounds,
            stable_rounds,
            click_text,
            pause,
        } => {
            scroll_until_stable(
                page,
                marker,
                *max_rounds,
                *stable_rounds,
                click_text.as_deref(),
                *pause,
            )
            .await
        }
    }
}

/// Headless Chrome through a WebDriver server such as `chromedriver --port=9515`.
#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    endpoint: String,
    page_load_timeout: Duration,
}

impl WebDriverRenderer {
    pub fn new(endpoint: impl Into<String>) -> ScrapeResult<Self> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Url::parse(&endpoint).map_err(|e| ScrapeError::RendererUnavailable(format!("{endpoint}: {e}")))?;
        Ok(Self {
            endpoint,
            page_load_timeout: Duration::from_secs(40),
        })
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut caps = Map::new();
        caps.insert("browserName".into(), json!("chrome"));
        caps.insert(
            "timeouts".into(),
            json!({ "pageLoad": self.page_load_timeout.as_millis() as u64 }),
        );
        caps.insert(
            "goog:chromeOptions".into(),
            json!({ "args": ["--headless=new", "--no-sandbox", "--disable-gpu", "--disable-dev-shm-usage"] }),
        );
        caps
    }

    async fn open_session(&self) -> ScrapeResult<Session> {
        let mut builder = ClientBuilder::rustls().map_err(|e| ScrapeError::RendererUnavailable(e.to_string()))?;
        builder.capabilities(self.capabilities());
        let client = builder
            .connect(&self.endpoint)
            .await
            .map_err(|e| ScrapeError::RendererUnavailable(truncate_for_log(&e.to_string(), 300)))?;
        debug!(endpoint = %self.endpoint, "webdriver session opened");
        Ok(Session { client, open: true })
    }
}

#[async_trait]
impl Renderer for WebDriverRenderer {
    #[instrument(level = "info", skip(self, plan))]
    async fn render(&self, url: &str, plan: &RenderPlan) -> ScrapeResult<String> {
        let t0 = Instant::now();
        let mut session = self.open_session().await?;
        let result = match session.client.goto(url).await {
            Ok(()) => run_plan(&mut session, plan).await,
            Err(e) => Err(cmd_error(e)),
        };
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close webdriver session");
        }
        match &result {
            Ok(html) => info!(bytes = html.len(), elapsed_ms = t0.elapsed().as_millis() as u64, "rendered"),
            Err(e) => warn!(error = %e, "render failed"),
        }
        result
    }
}

/// Driver error text; chromedriver appends a full stack trace, so it is cut.
fn cmd_error(e: CmdError) -> ScrapeError {
    ScrapeError::Render(truncate_for_log(&e.to_string(), 300))
}

/// One browser session. Ending it is tied to `Drop`, so a render dropped by
/// a caller's timeout still releases the browser on the WebDriver server.
struct Session {
    client: Client,
    open: bool,
}

impl Session {
    async fn close(mut self) -> ScrapeResult<()> {
        self.open = false;
        self.client.clone().close().await.map_err(cmd_error)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            warn!("no runtime to close abandoned webdriver session");
            return;
        };
        let client = self.client.clone();
        handle.spawn(async move {
            match client.close().await {
                Ok(()) => debug!("closed abandoned webdriver session"),
                Err(e) => warn!(error = %e, "failed to close abandoned webdriver session"),
            }
        });
    }
}

const CLICK_BY_TEXT: &str = r#"
const wanted = arguments[0];
for (const el of document.querySelectorAll('a, button')) {
  if (el.textContent.trim() === wanted) { el.click(); return true; }
}
return false;
"#;

#[async_trait]
impl BrowserPage for Session {
    async fn scroll_to_bottom(&mut self) -> ScrapeResult<()> {
        self.client
            .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
            .await
            .map(|_| ())
            .map_err(cmd_error)
    }

    async fn click_text(&mut self, text: &str) -> ScrapeResult<bool> {
        let clicked = self.client.execute(CLICK_BY_TEXT, vec![json!(text)]).await.map_err(cmd_error)?;
        Ok(clicked.as_bool().unwrap_or(false))
    }

    async fn has_selector(&mut self, selector: &str) -> ScrapeResult<bool> {
        let found = self
            .client
            .execute("return document.querySelector(arguments[0]) !== null;", vec![json!(selector)])
            .await
            .map_err(cmd_error)?;
        Ok(found.as_bool().unwrap_or(false))
    }

    async fn content(&mut self) -> ScrapeResult<String> {
        self.client.source().await.map_err(cmd_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::routing::{delete, post};
    use axum::{Json, Router};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Page whose link count grows by one per scroll until `grow_until`.
    struct GrowingPage {
        scrolls: usize,
        grow_until: usize,
        clicks: usize,
    }

    #[async_trait]
    impl BrowserPage for GrowingPage {
        async fn scroll_to_bottom(&mut self) -> ScrapeResult<()> {
            self.scrolls += 1;
            Ok(())
        }
        async fn click_text(&mut self, _text: &str) -> ScrapeResult<bool> {
            self.clicks += 1;
            Err(ScrapeError::Render("detached".into()))
        }
        async fn has_selector(&mut self, _selector: &str) -> ScrapeResult<bool> {
            Ok(true)
        }
        async fn content(&mut self) -> ScrapeResult<String> {
            Ok("mnews/article/ ".repeat(self.scrolls.min(self.grow_until)))
        }
    }

    #[tokio::test]
    async fn test_scroll_stops_after_stable_rounds() {
        let mut page = GrowingPage { scrolls: 0, grow_until: 3, clicks: 0 };
        let html = scroll_until_stable(&mut page, "mnews/article/", 55, 4, None, Duration::ZERO)
            .await
            .unwrap();
        // counts: 1,2,3,3,3,3,3 -> fourth repeat of 3 on round 7
        assert_eq!(page.scrolls, 7);
        assert_eq!(html.matches("mnews/article/").count(), 3);
    }

    #[tokio::test]
    async fn test_scroll_respects_round_cap() {
        let mut page = GrowingPage { scrolls: 0, grow_until: usize::MAX, clicks: 0 };
        scroll_until_stable(&mut page, "mnews/article/", 10, 4, None, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(page.scrolls, 10);
    }

    #[tokio::test]
    async fn test_zero_count_is_never_stable() {
        let mut page = GrowingPage { scrolls: 0, grow_until: 0, clicks: 0 };
        scroll_until_stable(&mut page, "mnews/article/", 6, 2, None, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(page.scrolls, 6);
    }

    #[tokio::test]
    async fn test_click_failures_do_not_abort() {
        let mut page = GrowingPage { scrolls: 0, grow_until: 2, clicks: 0 };
        let res = scroll_until_stable(&mut page, "mnews/article/", 20, 2, Some("더보기"), Duration::ZERO).await;
        assert!(res.is_ok());
        assert_eq!(page.clicks, page.scrolls);
    }

    #[tokio::test]
    async fn test_unreachable_webdriver_is_unavailable() {
        let r = WebDriverRenderer::new("http://127.0.0.1:1").unwrap();
        let plan = RenderPlan::Settle {
            wait_for: None,
            wait_timeout: Duration::ZERO,
            settle: Duration::ZERO,
        };
        match r.render("https://example.com", &plan).await {
            Err(ScrapeError::RendererUnavailable(_)) => {}
            other => panic!("expected RendererUnavailable, got {other:?}"),
        }
    }

    #[derive(Default)]
    struct DriverLog {
        opened: AtomicUsize,
        closed: AtomicUsize,
    }

    /// WebDriver stand-in whose navigation hangs for five seconds.
    async fn hanging_driver(log: Arc<DriverLog>) -> String {
        let app = Router::new()
            .route(
                "/session",
                post(|State(log): State<Arc<DriverLog>>| async move {
                    log.opened.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "value": { "sessionId": "s1", "capabilities": { "browserName": "chrome" } } }))
                }),
            )
            .route(
                "/session/{id}/url",
                post(|| async {
                    sleep(Duration::from_secs(5)).await;
                    Json(json!({ "value": null }))
                }),
            )
            .route(
                "/session/{id}",
                delete(|State(log): State<Arc<DriverLog>>| async move {
                    log.closed.fetch_add(1, Ordering::SeqCst);
                    Json(json!({ "value": null }))
                }),
            )
            .with_state(log);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_cancelled_render_closes_session() {
        let log = Arc::new(DriverLog::default());
        let endpoint = hanging_driver(log.clone()).await;
        let renderer = WebDriverRenderer::new(endpoint).unwrap();
        let plan = RenderPlan::Settle {
            wait_for: None,
            wait_timeout: Duration::ZERO,
            settle: Duration::ZERO,
        };

        let res = tokio::time::timeout(Duration::from_millis(300), renderer.render("https://example.com", &plan)).await;
        assert!(res.is_err());

        let deadline = Instant::now() + Duration::from_secs(10);
        while log.closed.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(log.opened.load(Ordering::SeqCst), 1);
        assert!(log.closed.load(Ordering::SeqCst) >= 1, "webdriver session left open after cancellation");
    }
}
