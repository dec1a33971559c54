//! Single-pass aggregation of normalized sales into product, agent and
//! client summary tables.

use crate::normalize::NormalizedSale;
use crate::record::RawRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub name: String,
    /// Category of the last row seen for this product
    pub category: String,
    pub revenue: f64,
    pub profit: f64,
    pub cost: f64,
    pub quantity: i64,
    /// Running sum while folding; per-row mean after `finalize`
    pub margin: f64,
    pub count: u64,
}

impl ProductSummary {
    fn new(name: &str, category: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            revenue: 0.0,
            profit: 0.0,
            cost: 0.0,
            quantity: 0,
            margin: 0.0,
            count: 0,
        }
    }

    fn add(&mut self, sale: &NormalizedSale) {
        self.revenue += sale.revenue;
        self.profit += sale.profit;
        self.cost += sale.cost;
        self.quantity = self.quantity.saturating_add(sale.quantity);
        self.margin += sale.margin;
        self.count += 1;
        // Last write wins, even when an earlier row used another category
        self.category.clone_from(&sale.category);
    }

    fn finalize(&mut self) {
        if self.count > 0 {
            self.margin /= self.count as f64;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub name: String,
    pub revenue: f64,
    pub profit: f64,
    pub quantity: i64,
    pub sales: u64,
}

impl AgentSummary {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            revenue: 0.0,
            profit: 0.0,
            quantity: 0,
            sales: 0,
        }
    }

    fn add(&mut self, sale: &NormalizedSale) {
        self.revenue += sale.revenue;
        self.profit += sale.profit;
        self.quantity = self.quantity.saturating_add(sale.quantity);
        self.sales += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub name: String,
    pub revenue: f64,
    pub profit: f64,
    pub purchases: u64,
}

impl ClientSummary {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            revenue: 0.0,
            profit: 0.0,
            purchases: 0,
        }
    }

    fn add(&mut self, sale: &NormalizedSale) {
        self.revenue += sale.revenue;
        self.profit += sale.profit;
        self.purchases += 1;
    }
}

/// Result of folding every row. Tables are keyed by name; BTreeMap keeps
/// iteration order deterministic for the same input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    /// Distinct categories, ascending
    pub categories: Vec<String>,
    pub products: BTreeMap<String, ProductSummary>,
    pub agents: BTreeMap<String, AgentSummary>,
    pub clients: BTreeMap<String, ClientSummary>,
}

/// Accumulates rows one at a time; `finish` runs the margin finalization
/// exactly once by consuming the builder.
#[derive(Debug, Default)]
pub struct Aggregator {
    categories: BTreeSet<String>,
    products: BTreeMap<String, ProductSummary>,
    agents: BTreeMap<String, AgentSummary>,
    clients: BTreeMap<String, ClientSummary>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sale: &NormalizedSale) {
        if !self.categories.contains(&sale.category) {
            self.categories.insert(sale.category.clone());
        }

        self.products
            .entry(sale.product.clone())
            .or_insert_with(|| ProductSummary::new(&sale.product, &sale.category))
            .add(sale);

        self.agents
            .entry(sale.agent.clone())
            .or_insert_with(|| AgentSummary::new(&sale.agent))
            .add(sale);

        self.clients
            .entry(sale.client.clone())
            .or_insert_with(|| ClientSummary::new(&sale.client))
            .add(sale);
    }

    pub fn finish(mut self) -> Aggregation {
        for product in self.products.values_mut() {
            product.finalize();
        }
        Aggregation {
            categories: self.categories.into_iter().collect(),
            products: self.products,
            agents: self.agents,
            clients: self.clients,
        }
    }
}

/// Normalize and fold `rows` in order
pub fn aggregate(rows: &[RawRecord]) -> Aggregation {
    let mut aggregator = Aggregator::new();
    for row in rows {
        aggregator.push(&NormalizedSale::from_raw(row));
    }
    aggregator.finish()
}
