//! Snapshot of one loaded dataset and the container that swaps it.
//!
//! Every load rebuilds the whole snapshot from the raw rows; nothing from a
//! previous dataset carries over.

use crate::aggregate::{aggregate, AgentSummary, ClientSummary, ProductSummary};
use crate::decode::{decode_bytes, DecodeError};
use crate::record::RawRecord;
use crate::stats::{calculate_stats, StatsSummary};
use crate::timeseries::{revenue_by_date, DateBucket};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub snapshot_id: Uuid,
    pub loaded_at: DateTime<Utc>,
    /// Where the rows came from (file path or URL)
    pub source: String,
    pub row_count: usize,
    pub categories: Vec<String>,
    pub products: BTreeMap<String, ProductSummary>,
    pub agents: BTreeMap<String, AgentSummary>,
    pub clients: BTreeMap<String, ClientSummary>,
    pub stats: StatsSummary,
    pub revenue_by_date: Vec<DateBucket>,
}

impl Snapshot {
    /// Run the full pipeline over `raw`
    pub fn build(source: impl Into<String>, raw: Vec<RawRecord>) -> Self {
        let snapshot = Self::from_rows(source.into(), &raw);
        info!(
            snapshot_id = %snapshot.snapshot_id,
            source = %snapshot.source,
            rows = snapshot.row_count,
            products = snapshot.products.len(),
            agents = snapshot.agents.len(),
            clients = snapshot.clients.len(),
            days = snapshot.revenue_by_date.len(),
            "built snapshot"
        );
        snapshot
    }

    /// Placeholder shown while nothing is loaded. Not logged.
    pub fn empty() -> Self {
        Self::from_rows(String::new(), &[])
    }

    fn from_rows(source: String, raw: &[RawRecord]) -> Self {
        let aggregation = aggregate(raw);
        let stats = calculate_stats(&aggregation.products);

        Self {
            snapshot_id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            source,
            row_count: raw.len(),
            categories: aggregation.categories,
            products: aggregation.products,
            agents: aggregation.agents,
            clients: aggregation.clients,
            stats,
            revenue_by_date: revenue_by_date(raw),
        }
    }
}

/// Owns the current snapshot. Loads replace it wholesale.
#[derive(Debug, Default)]
pub struct AppState {
    current: Option<Snapshot>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Install `snapshot`, returning the one it replaced
    pub fn replace(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.current.replace(snapshot)
    }

    pub fn load_records(&mut self, source: impl Into<String>, raw: Vec<RawRecord>) -> &Snapshot {
        self.current.insert(Snapshot::build(source, raw))
    }

    /// Decode `bytes` and replace the snapshot. On a decode error the
    /// current snapshot is left as it was.
    pub fn load_bytes(
        &mut self,
        source: impl Into<String>,
        path_hint: Option<&Path>,
        bytes: &[u8],
    ) -> Result<&Snapshot, DecodeError> {
        let raw = decode_bytes(path_hint, bytes)?;
        Ok(self.load_records(source, raw))
    }
}
