//! # Daily Editorials
//!
//! Collects the day's newspaper editorials from Korean publishers (and the
//! WSJ opinion feed), normalizes them into one flat record, and serves them
//! through a small JSON API.
//!
//! ## Features
//!
//! - One adapter per publisher: 조선일보, 중앙일보, 동아일보, 한겨레,
//!   경향신문, 한국경제신문, 매일경제, 국민일보, 서울신문, 국제신문, 부산일보,
//!   Wall Street Journal
//! - Optional 네이버 오피니언 aggregator covering every outlet at once
//! - Optional WebDriver rendering for script-built listings
//! - Live scraping per request; nothing is stored
//!
//! ## Usage
//!
//! ```sh
//! daily_editorials serve --bind 127.0.0.1:8000
//! daily_editorials collect --date 2026-02-12 -j ./json
//! ```
//!
//! ## Architecture
//!
//! 1. **Adapters**: each publisher module turns listing pages or a feed into
//!    [`models::Editorial`] records for one date
//! 2. **Registry**: the configured, ordered set of adapters
//! 3. **Fan-out**: every selected adapter runs concurrently under a timeout;
//!    results are merged, trimmed, and sorted
//! 4. **Surface**: the axum API, or a one-shot JSON snapshot

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod error;
mod fanout;
mod http;
mod models;
mod outputs;
mod render;
mod rss;
mod scrapers;
mod utils;

use cli::{Cli, Command};
use config::Settings;
use outputs::json;
use render::{Renderer, WebDriverRenderer};
use scrapers::Registry;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    let settings = Settings::resolve(&args).await?;
    info!(version = env!("CARGO_PKG_VERSION"), "daily_editorials starting up");

    let renderer = build_renderer(&settings);
    let registry = scrapers::build_registry(&settings, renderer);

    match args.command {
        Command::Serve => serve(registry, settings).await,
        Command::Collect {
            date,
            source,
            json_output_dir,
        } => collect_once(&registry, &settings, date.as_deref(), source.as_deref(), json_output_dir.as_deref()).await,
    }
}

fn build_renderer(settings: &Settings) -> Option<Arc<dyn Renderer>> {
    let endpoint = settings.webdriver_url.as_deref()?;
    match WebDriverRenderer::new(endpoint) {
        Ok(r) => {
            info!(%endpoint, "Headless rendering enabled");
            Some(Arc::new(r))
        }
        Err(e) => {
            warn!(%endpoint, error = %e, "Could not set up the WebDriver client; using static fetches only");
            None
        }
    }
}

async fn serve(registry: Registry, settings: Settings) -> Result<(), Box<dyn Error>> {
    let bind = settings.bind.clone();
    let state = api::AppState {
        registry,
        settings: Arc::new(settings),
    };
    let app = api::create_router(state);

    let listener = match tokio::net::TcpListener::bind(&bind).await {
        Ok(l) => l,
        Err(e) => {
            error!(%bind, error = %e, "Failed to bind");
            return Err(e.into());
        }
    };
    info!(%bind, "API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn collect_once(
    registry: &Registry,
    settings: &Settings,
    date: Option<&str>,
    source: Option<&str>,
    json_output_dir: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let date = match date {
        Some(raw) => utils::parse_ymd(raw).ok_or_else(|| format!("invalid date {raw:?}; expected YYYY-MM-DD"))?,
        None => utils::today(),
    };
    if let Some(name) = source {
        if !registry.contains(name) {
            warn!(source = %name, known = %registry.names().join(", "), "No registered adapter has this name");
        }
    }

    let start_time = std::time::Instant::now();
    let response = fanout::collect(registry, date, source, settings.fetch_timeout(), settings.summary_chars).await;
    info!(
        total = response.total,
        elapsed_secs = start_time.elapsed().as_secs(),
        "Collection complete"
    );

    match json_output_dir {
        Some(dir) => {
            json::write_response(&response, dir).await?;
        }
        None => json::print_response(&response).await?,
    }
    Ok(())
}
