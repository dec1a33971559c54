//! Collector Service - Downloads the default sales dataset
//!
//! Responsibilities:
//! - Fetch the default dataset (JSON array of sale rows) once
//! - Validate that it decodes into records before keeping it
//! - Hash the content to skip redundant writes
//! - Store it under DATA_DIR where the dashboard picks it up
//!
//! Usage:
//!   # URL from DEFAULT_DATA_URL:
//!   cargo run --bin collector
//!
//!   # Explicit URL, overwrite even when unchanged:
//!   cargo run --bin collector -- --url https://example.com/data.json --force

use analytics::source::{fetch_bytes, DEFAULT_DATA_FILE};
use analytics::{decode_bytes, Snapshot};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "collector", about = "Downloads the default sales dataset")]
struct Args {
    /// URL to fetch (defaults to DEFAULT_DATA_URL)
    #[arg(long)]
    url: Option<String>,

    /// Write even if the stored copy has the same hash
    #[arg(long, default_value = "false")]
    force: bool,

    /// Dry run - fetch and validate only, write nothing
    #[arg(long, default_value = "false")]
    dry_run: bool,
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
}

/// What happened to the fetched dataset
#[derive(Debug, PartialEq, Eq)]
enum StoreOutcome {
    Written(PathBuf),
    Unchanged,
    DryRun,
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

fn hash_path(data_path: &Path) -> PathBuf {
    let mut name = data_path.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Hash recorded next to the stored dataset, if any
async fn stored_hash(data_path: &Path) -> Option<String> {
    fs::read_to_string(hash_path(data_path))
        .await
        .ok()
        .map(|s| s.trim().to_string())
}

/// Validate and store `bytes` as the default dataset
async fn store_dataset(
    data_dir: &Path,
    bytes: &[u8],
    force: bool,
    dry_run: bool,
) -> Result<StoreOutcome> {
    let records = decode_bytes(Some(Path::new(DEFAULT_DATA_FILE)), bytes)
        .context("Downloaded dataset is not a JSON array of records")?;

    let snapshot = Snapshot::build("download", records);
    println!(
        "  Rows: {}, products: {}, agents: {}, clients: {}, days: {}",
        snapshot.row_count,
        snapshot.products.len(),
        snapshot.agents.len(),
        snapshot.clients.len(),
        snapshot.revenue_by_date.len()
    );

    let hash = content_hash(bytes);
    println!("  Hash: {}", hash);

    if dry_run {
        println!("  Dry run - nothing written");
        return Ok(StoreOutcome::DryRun);
    }

    let data_path = data_dir.join(DEFAULT_DATA_FILE);
    if !force && stored_hash(&data_path).await.as_deref() == Some(hash.as_str()) {
        println!("  Dataset unchanged, keeping {}", data_path.display());
        return Ok(StoreOutcome::Unchanged);
    }

    fs::create_dir_all(data_dir)
        .await
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    fs::write(&data_path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", data_path.display()))?;
    fs::write(hash_path(&data_path), &hash)
        .await
        .context("Failed to write hash file")?;

    debug!(path = %data_path.display(), "dataset stored");
    println!("  Saved to: {}", data_path.display());
    Ok(StoreOutcome::Written(data_path))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "analytics=info,collector=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let url = args
        .url
        .clone()
        .or_else(|| config.default_data_url.clone())
        .context("No URL given: pass --url or set DEFAULT_DATA_URL")?;

    println!("=== Sales Dataset Collector ===");
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });
    println!("Data dir: {}", config.data_dir.display());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .user_agent(concat!("sales-dashboard-collector/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    println!("  Fetching: {}", url);
    let started = Utc::now();
    let bytes = fetch_bytes(&client, &url)
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    println!(
        "  Downloaded: {} bytes in {}ms",
        bytes.len(),
        (Utc::now() - started).num_milliseconds()
    );

    let outcome = store_dataset(&config.data_dir, &bytes, args.force, args.dry_run).await?;
    info!(?outcome, url = %url, "collection finished");

    println!("\n=== Collection Complete ===");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATASET: &[u8] = br#"[
        {"Product": "Tea", "Category": "Drinks", "Revenue": 10, "Sale Date": "2024-03-05"},
        {"Product": "Cola", "Category": "Drinks", "Revenue": 5, "Sale Date": "2024-03-06"}
    ]"#;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("collector-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_content_hash_format() {
        let hash = content_hash(b"abc");
        assert_eq!(
            hash,
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hash_path() {
        assert_eq!(hash_path(Path::new("data/data.json")), PathBuf::from("data/data.json.sha256"));
    }

    #[tokio::test]
    async fn test_store_then_skip_unchanged() {
        let dir = temp_dir("store");
        let first = store_dataset(&dir, DATASET, false, false).await.unwrap();
        assert_eq!(first, StoreOutcome::Written(dir.join(DEFAULT_DATA_FILE)));

        let second = store_dataset(&dir, DATASET, false, false).await.unwrap();
        assert_eq!(second, StoreOutcome::Unchanged);

        let forced = store_dataset(&dir, DATASET, true, false).await.unwrap();
        assert!(matches!(forced, StoreOutcome::Written(_)));

        fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = temp_dir("dry");
        let outcome = store_dataset(&dir, DATASET, false, true).await.unwrap();
        assert_eq!(outcome, StoreOutcome::DryRun);
        assert!(fs::metadata(dir.join(DEFAULT_DATA_FILE)).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_dataset_is_rejected() {
        let dir = temp_dir("invalid");
        let result = store_dataset(&dir, br#"{"rows": []}"#, false, false).await;
        assert!(result.is_err());
        assert!(fs::metadata(dir.join(DEFAULT_DATA_FILE)).await.is_err());
    }
}
