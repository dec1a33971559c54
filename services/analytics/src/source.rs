//! Default dataset: a JSON document fetched once at startup, either over
//! HTTP or from the collector's on-disk copy.

use crate::decode::{decode_json, DecodeError};
use crate::record::RawRecord;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};

/// File name the collector writes under its data directory
pub const DEFAULT_DATA_FILE: &str = "data.json";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone)]
pub enum DefaultSource {
    Url(String),
    Path(PathBuf),
}

impl fmt::Display for DefaultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultSource::Url(url) => write!(f, "{}", url),
            DefaultSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One GET; non-2xx statuses are errors
pub async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, SourceError> {
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// GET `url` and decode the body as a JSON array of records
pub async fn fetch_records(client: &reqwest::Client, url: &str) -> Result<Vec<RawRecord>, SourceError> {
    let bytes = fetch_bytes(client, url).await?;
    Ok(decode_json(&bytes)?)
}

pub async fn read_records(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    let bytes = fs::read(path).await.map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_json(&bytes)?)
}

async fn try_load(client: &reqwest::Client, source: &DefaultSource) -> Result<Vec<RawRecord>, SourceError> {
    match source {
        DefaultSource::Url(url) => fetch_records(client, url).await,
        DefaultSource::Path(path) => read_records(path).await,
    }
}

/// Load the default dataset. Any failure means "no default data": it is
/// logged and `None` is returned so the caller shows the empty state.
pub async fn load_default(client: &reqwest::Client, source: &DefaultSource) -> Option<Vec<RawRecord>> {
    match try_load(client, source).await {
        Ok(records) => {
            info!(source = %source, rows = records.len(), "loaded default dataset");
            Some(records)
        }
        Err(e) => {
            warn!(source = %source, error = %e, "no default data found");
            None
        }
    }
}
