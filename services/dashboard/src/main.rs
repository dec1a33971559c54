//! Dashboard - Terminal view over sales analytics
//!
//! Responsibilities:
//! - Load one dataset (uploaded file or the default dataset)
//! - Run the aggregation pipeline into a snapshot
//! - Print totals, leaderboards, lists and the recent revenue chart
//! - Interactive session where `load` swaps the snapshot wholesale
//!
//! Usage:
//!   # Default dataset (DEFAULT_DATA_URL or DATA_DIR/data.json):
//!   cargo run --bin dashboard -- report
//!
//!   # A spreadsheet export:
//!   cargo run --bin dashboard -- --file sales.xlsx products --query choy
//!
//!   # Interactive:
//!   cargo run --bin dashboard -- shell

mod render;
mod shell;

use analytics::source::DEFAULT_DATA_FILE;
use analytics::views::{CLIENT_LIST_LIMIT, PRODUCT_LIST_LIMIT};
use analytics::{load_default, AppState, DefaultSource, Snapshot};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dashboard", about = "Sales analytics dashboard")]
struct Args {
    /// Spreadsheet (xlsx/xls/ods), CSV or JSON file to load instead of the default dataset
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Default dataset URL (overrides DEFAULT_DATA_URL)
    #[arg(long, global = true)]
    data_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Totals, top products and agents, and the recent revenue chart
    Report {
        /// Print the report as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },
    /// Products by revenue, optionally filtered by name or category
    Products {
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long, default_value_t = PRODUCT_LIST_LIMIT)]
        limit: usize,
    },
    /// All agents by revenue
    Agents,
    /// Clients by revenue with average check
    Clients {
        #[arg(long, default_value_t = CLIENT_LIST_LIMIT)]
        limit: usize,
    },
    /// Distinct categories
    Categories,
    /// Revenue and profit per day
    Series {
        /// Show every day instead of the chart window
        #[arg(long, default_value = "false")]
        all: bool,
    },
    /// Interactive session
    Shell,
}

#[derive(Debug, Clone)]
struct Config {
    default_data_url: Option<String>,
    data_dir: PathBuf,
    http_timeout_secs: u64,
}

impl Config {
    fn from_env() -> Self {
        Self {
            default_data_url: std::env::var("DEFAULT_DATA_URL").ok().filter(|s| !s.is_empty()),
            data_dir: PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string())),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
        }
    }

    /// URL when configured, otherwise the collector's cached copy
    fn default_source(&self) -> DefaultSource {
        match &self.default_data_url {
            Some(url) => DefaultSource::Url(url.clone()),
            None => DefaultSource::Path(self.data_dir.join(DEFAULT_DATA_FILE)),
        }
    }
}

/// Read and decode a file into `state`. The snapshot is only replaced when
/// both steps succeed.
pub async fn load_file(state: &mut AppState, path: &Path) -> Result<()> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot = state
        .load_bytes(path.display().to_string(), Some(path), &bytes)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    info!(rows = snapshot.row_count, "loaded {}", path.display());
    Ok(())
}

async fn initial_state(args: &Args, config: &Config, client: &reqwest::Client) -> Result<AppState> {
    let mut state = AppState::new();
    match &args.file {
        Some(path) => load_file(&mut state, path).await?,
        None => {
            let source = config.default_source();
            if let Some(rows) = load_default(client, &source).await {
                state.load_records(source.to_string(), rows);
            }
        }
    }
    Ok(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "analytics=info,dashboard=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(url) = &args.data_url {
        config.default_data_url = Some(url.clone());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let mut state = initial_state(&args, &config, &client).await?;

    if let Command::Shell = args.command {
        return shell::run(&mut state).await;
    }

    let empty;
    let snapshot = match state.current() {
        Some(s) => s,
        None => {
            empty = Snapshot::empty();
            &empty
        }
    };

    match &args.command {
        Command::Report { json: true } => {
            let report = render::DashboardReport::new(snapshot);
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
        }
        Command::Report { json: false } => print!("{}", render::dashboard(snapshot)),
        Command::Products { query, limit } => print!("{}", render::products(snapshot, query, *limit)),
        Command::Agents => print!("{}", render::agents(snapshot)),
        Command::Clients { limit } => print!("{}", render::clients(snapshot, *limit)),
        Command::Categories => print!("{}", render::categories(snapshot)),
        Command::Series { all } => print!("{}", render::series(snapshot, *all)),
        Command::Shell => unreachable!("handled above"),
    }

    Ok(())
}
