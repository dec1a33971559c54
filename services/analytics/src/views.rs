//! Ordered slices of the aggregation handed to the presentation layer:
//! leaderboards, the searchable product list and the chart window.

use crate::aggregate::{AgentSummary, ClientSummary, ProductSummary};
use crate::timeseries::DateBucket;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const TOP_LIMIT: usize = 5;
pub const PRODUCT_LIST_LIMIT: usize = 30;
pub const CLIENT_LIST_LIMIT: usize = 30;
pub const CHART_WINDOW: usize = 14;

/// Medal for a 0-based leaderboard position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RankTier {
    Gold,
    Silver,
    Bronze,
    Default,
}

impl RankTier {
    pub fn for_rank(index: usize) -> Self {
        match index {
            0 => RankTier::Gold,
            1 => RankTier::Silver,
            2 => RankTier::Bronze,
            _ => RankTier::Default,
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Stable sort keeps table (name) order among equal keys
fn sorted_desc<'a, T>(items: impl Iterator<Item = &'a T>, key: impl Fn(&T) -> f64) -> Vec<&'a T>
where
    T: 'a,
{
    let mut list: Vec<&T> = items.collect();
    list.sort_by(|a, b| descending(key(*a), key(*b)));
    list
}

pub fn top_products(products: &BTreeMap<String, ProductSummary>, limit: usize) -> Vec<&ProductSummary> {
    let mut list = sorted_desc(products.values(), |p| p.profit);
    list.truncate(limit);
    list
}

pub fn top_agents(agents: &BTreeMap<String, AgentSummary>, limit: usize) -> Vec<&AgentSummary> {
    let mut list = agents_by_revenue(agents);
    list.truncate(limit);
    list
}

/// Case-insensitive substring match on product name or category, by
/// revenue descending. An empty query matches every product.
pub fn filter_products<'a>(
    products: &'a BTreeMap<String, ProductSummary>,
    query: &str,
) -> Vec<&'a ProductSummary> {
    let query = query.to_lowercase();
    let matching = products.values().filter(|p| {
        query.is_empty()
            || p.name.to_lowercase().contains(&query)
            || p.category.to_lowercase().contains(&query)
    });
    sorted_desc(matching, |p| p.revenue)
}

pub fn agents_by_revenue(agents: &BTreeMap<String, AgentSummary>) -> Vec<&AgentSummary> {
    sorted_desc(agents.values(), |a| a.revenue)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRow<'a> {
    #[serde(flatten)]
    pub client: &'a ClientSummary,
    pub average_check: f64,
}

pub fn clients_by_revenue(clients: &BTreeMap<String, ClientSummary>, limit: usize) -> Vec<ClientRow<'_>> {
    sorted_desc(clients.values(), |c| c.revenue)
        .into_iter()
        .take(limit)
        .map(|client| ClientRow {
            client,
            average_check: average_check(client),
        })
        .collect()
}

pub fn average_check(client: &ClientSummary) -> f64 {
    if client.purchases > 0 {
        client.revenue / client.purchases as f64
    } else {
        0.0
    }
}

/// Most recent `CHART_WINDOW` buckets, oldest first
pub fn chart_window(series: &[DateBucket]) -> &[DateBucket] {
    let start = series.len().saturating_sub(CHART_WINDOW);
    &series[start..]
}
