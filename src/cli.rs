//! Command-line interface definitions for Daily Editorials.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every global option can also come from an environment variable; anything
//! left unset falls back to the `--config` file and then to built-in defaults
//! (see [`crate::config::Settings`]).

use clap::{Parser, Subcommand};

/// Command-line arguments for the Daily Editorials application.
///
/// # Examples
///
/// ```sh
/// # Serve the API on the default address
/// daily_editorials serve
///
/// # Serve with a config file and a WebDriver for script-rendered listings
/// daily_editorials --config settings.yaml --webdriver-url http://localhost:4444 serve
///
/// # Collect one day once and write ./json/2026-02-12.json
/// daily_editorials collect --date 2026-02-12 -j ./json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "EDITORIALS_CONFIG")]
    pub config: Option<String>,

    /// Address to bind the API server to
    #[arg(long, global = true, env = "EDITORIALS_BIND")]
    pub bind: Option<String>,

    /// Per-adapter timeout in seconds
    #[arg(long, global = true, env = "EDITORIALS_FETCH_TIMEOUT_SECS")]
    pub fetch_timeout_secs: Option<u64>,

    /// Summary character budget in responses
    #[arg(long, global = true, env = "EDITORIALS_SUMMARY_CHARS")]
    pub summary_chars: Option<usize>,

    /// Comma-separated adapter names to register
    #[arg(long, global = true, env = "EDITORIALS_SOURCES", value_delimiter = ',')]
    pub sources: Option<Vec<String>>,

    /// Also register the portal aggregator
    #[arg(long, global = true, env = "EDITORIALS_INCLUDE_AGGREGATOR")]
    pub include_aggregator: bool,

    /// WebDriver endpoint for headless rendering
    #[arg(long, global = true, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Directory of static UI files
    #[arg(long, global = true, env = "EDITORIALS_STATIC_DIR")]
    pub static_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the JSON API server
    Serve,

    /// Collect once and print or write the result
    Collect {
        /// Date to collect (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<String>,

        /// Only run the adapter with this name
        #[arg(short, long)]
        source: Option<String>,

        /// Write `{date}.json` into this directory instead of printing
        #[arg(short, long)]
        json_output_dir: Option<String>,
    },
}
