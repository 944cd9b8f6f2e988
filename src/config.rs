//! Runtime settings.
//!
//! Resolved in three layers: built-in defaults, then an optional YAML file
//! given with `--config`, then any flag or environment variable set on the
//! command line.
//!
//! ```yaml
//! bind: 127.0.0.1:8080
//! fetch_timeout_secs: 60
//! sources: [조선일보, 한겨레, 네이버 오피니언]
//! webdriver_url: http://localhost:4444
//! static_dir: ./static
//! ```

use crate::cli::Cli;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the API server listens on.
    pub bind: String,
    /// Wall-clock ceiling for one adapter within a collection run.
    pub fetch_timeout_secs: u64,
    /// Summary character budget in API responses.
    pub summary_chars: usize,
    /// Adapter names to register. `None` registers every publisher adapter.
    pub sources: Option<Vec<String>>,
    /// Register the portal aggregator alongside the publisher adapters.
    pub include_aggregator: bool,
    /// WebDriver endpoint used for script-rendered listings.
    pub webdriver_url: Option<String>,
    /// Directory served under `/static`, with its `index.html` at `/`.
    pub static_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            fetch_timeout_secs: 90,
            summary_chars: 300,
            sources: None,
            include_aggregator: false,
            webdriver_url: None,
            static_dir: None,
        }
    }
}

impl Settings {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Parse settings from YAML text; absent keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Defaults, overlaid with the `--config` file if any, overlaid with the CLI.
    pub async fn resolve(cli: &Cli) -> Result<Self, Box<dyn Error>> {
        let mut settings = match &cli.config {
            Some(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| format!("cannot read config file {path}: {e}"))?;
                info!(%path, "Loaded configuration file");
                Self::from_yaml(&text).map_err(|e| format!("invalid config file {path}: {e}"))?
            }
            None => Self::default(),
        };
        settings.apply_cli(cli);
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(bind) = &cli.bind {
            self.bind = bind.clone();
        }
        if let Some(secs) = cli.fetch_timeout_secs {
            self.fetch_timeout_secs = secs;
        }
        if let Some(chars) = cli.summary_chars {
            self.summary_chars = chars;
        }
        if let Some(sources) = &cli.sources {
            self.sources = Some(sources.clone());
        }
        if cli.include_aggregator {
            self.include_aggregator = true;
        }
        if let Some(url) = &cli.webdriver_url {
            self.webdriver_url = Some(url.clone());
        }
        if let Some(dir) = &cli.static_dir {
            self.static_dir = Some(dir.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let s = Settings::from_yaml("fetch_timeout_secs: 30\nsources: [한겨레]\n").unwrap();
        assert_eq!(s.fetch_timeout_secs, 30);
        assert_eq!(s.sources, Some(vec!["한겨레".to_string()]));
        assert_eq!(s.bind, "0.0.0.0:8000");
        assert_eq!(s.summary_chars, 300);
        assert!(!s.include_aggregator);
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut s = Settings::from_yaml("bind: 127.0.0.1:9000\nfetch_timeout_secs: 30\n").unwrap();
        let cli = Cli::parse_from([
            "daily_editorials",
            "--fetch-timeout-secs",
            "45",
            "--sources",
            "조선일보,경향신문",
            "--include-aggregator",
            "serve",
        ]);
        s.apply_cli(&cli);
        assert_eq!(s.bind, "127.0.0.1:9000");
        assert_eq!(s.fetch_timeout(), Duration::from_secs(45));
        assert_eq!(s.sources, Some(vec!["조선일보".to_string(), "경향신문".to_string()]));
        assert!(s.include_aggregator);
    }

    #[tokio::test]
    async fn test_missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["daily_editorials", "--config", "/nonexistent/settings.yaml", "serve"]);
        assert!(Settings::resolve(&cli).await.is_err());
    }
}
