//! HTTP surface.
//!
//! | Route | Response |
//! |-------|----------|
//! | `GET /health` | `{"status":"ok"}` |
//! | `GET /api/editorials?date=&source=` | [`EditorialsResponse`] |
//! | `GET /api/dates?days=` | `{"dates":[...]}`, today first |
//! | `GET /api/sources` | `{"sources":[...]}` |
//! | `GET /api/scrapers` | `{"count":N,"sources":[...]}` |
//!
//! Every editorial request scrapes live; nothing is cached or stored. With a
//! static directory configured, its files are served under `/static` and its
//! `index.html` at `/`.

use crate::config::Settings;
use crate::fanout;
use crate::models::EditorialsResponse;
use crate::scrapers::Registry;
use crate::utils::{parse_ymd, today};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::Days;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, instrument, warn};

const DEFAULT_DAYS: i64 = 90;
const MIN_DAYS: i64 = 7;
const MAX_DAYS: i64 = 365;

#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub settings: Arc<Settings>,
}

pub fn create_router(state: AppState) -> Router {
    let static_dir = state.settings.static_dir.clone();
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/api/editorials", get(editorials))
        .route("/api/dates", get(dates))
        .route("/api/sources", get(sources))
        .route("/api/scrapers", get(scrapers));
    if let Some(dir) = static_dir {
        info!(%dir, "Serving static files");
        router = router
            .route_service("/", ServeFile::new(Path::new(&dir).join("index.html")))
            .nest_service("/static", ServeDir::new(dir));
    }
    router.layer(CorsLayer::very_permissive()).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct EditorialsQuery {
    date: Option<String>,
    source: Option<String>,
}

#[instrument(level = "info", skip(state))]
async fn editorials(State(state): State<AppState>, Query(q): Query<EditorialsQuery>) -> Json<EditorialsResponse> {
    let date = match q.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => today(),
        Some(raw) => match parse_ymd(raw) {
            Some(d) => d,
            None => {
                warn!(date = %raw, "rejecting unparseable date");
                return Json(EditorialsResponse::empty(
                    today().to_string(),
                    Some(format!("invalid date {raw:?}; expected YYYY-MM-DD")),
                ));
            }
        },
    };
    let source = q.source.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let resp = fanout::collect(
        &state.registry,
        date,
        source,
        state.settings.fetch_timeout(),
        state.settings.summary_chars,
    )
    .await;
    Json(resp)
}

#[derive(Debug, Deserialize)]
struct DatesQuery {
    days: Option<String>,
}

async fn dates(Query(q): Query<DatesQuery>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let days = match q.days.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_DAYS,
        Some(raw) => raw.parse::<i64>().unwrap_or(0),
    };
    if !(MIN_DAYS..=MAX_DAYS).contains(&days) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": format!("days must be an integer between {MIN_DAYS} and {MAX_DAYS}") })),
        ));
    }
    Ok(Json(json!({ "dates": recent_dates(days as u64) })))
}

/// `days` consecutive dates ending today, newest first.
fn recent_dates(days: u64) -> Vec<String> {
    let start = today();
    (0..days)
        .filter_map(|i| start.checked_sub_days(Days::new(i)))
        .map(|d| d.to_string())
        .collect()
}

async fn sources(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "sources": state.registry.names() }))
}

async fn scrapers(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "count": state.registry.len(), "sources": state.registry.names() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeResult;
    use crate::models::Editorial;
    use crate::scrapers::SourceAdapter;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    struct Today(&'static str);

    #[async_trait]
    impl SourceAdapter for Today {
        fn source_name(&self) -> &str {
            self.0
        }
        async fn fetch_latest(&self) -> ScrapeResult<Vec<Editorial>> {
            let url = format!("https://example.com/{}", self.0);
            Ok(vec![Editorial::new(self.0, "[사설] 오늘", url, today()).with_summary(Some("가".repeat(500)))])
        }
    }

    fn app() -> Router {
        create_router(AppState {
            registry: Registry::new(vec![Arc::new(Today("B")), Arc::new(Today("A"))]),
            settings: Arc::new(Settings::default()),
        })
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let resp = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_editorials_defaults_to_today() {
        let (status, body) = get_json("/api/editorials").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["date"], today().to_string());
        assert_eq!(body["items"][0]["source"], "A");
        assert_eq!(body["items"][0]["summary"].as_str().unwrap().chars().count(), 300);
        assert_eq!(body["by_source"]["B"], json!({ "count": 1 }));
    }

    #[tokio::test]
    async fn test_editorials_unknown_source_is_empty() {
        let (status, body) = get_json("/api/editorials?source=%EC%97%86%EC%9D%8C").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
        assert!(body["items"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_editorials_invalid_date() {
        let (status, body) = get_json("/api/editorials?date=2026-13-40").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 0);
        assert_eq!(body["date"], today().to_string());
        assert!(body["error"].as_str().is_some_and(|e| e.contains("2026-13-40")));
    }

    #[tokio::test]
    async fn test_dates_week() {
        let (status, body) = get_json("/api/dates?days=7").await;
        assert_eq!(status, StatusCode::OK);
        let dates: Vec<String> = serde_json::from_value(body["dates"].clone()).unwrap();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], today().to_string());
        assert!(dates.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn test_dates_default_and_bounds() {
        let (_, body) = get_json("/api/dates").await;
        assert_eq!(body["dates"].as_array().unwrap().len(), 90);

        let (status, body) = get_json("/api/dates?days=6").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let (status, _) = get_json("/api/dates?days=366").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_dates_rejects_non_integer_days() {
        for uri in ["/api/dates?days=abc", "/api/dates?days=7.5"] {
            let (status, body) = get_json(uri).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert!(body["error"].as_str().is_some_and(|e| e.contains("integer")));
        }
    }

    #[tokio::test]
    async fn test_sources_and_scrapers() {
        let (_, body) = get_json("/api/sources").await;
        assert_eq!(body, json!({ "sources": ["B", "A"] }));

        let (_, body) = get_json("/api/scrapers").await;
        assert_eq!(body, json!({ "count": 2, "sources": ["B", "A"] }));
    }
}
