//! Scalar totals derived from the product table.

use crate::aggregate::ProductSummary;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub total_quantity: i64,
    /// Mean of the per-product mean margins, as a percentage. Not weighted
    /// by revenue.
    pub avg_margin: f64,
}

pub fn calculate_stats(products: &BTreeMap<String, ProductSummary>) -> StatsSummary {
    let mut stats = StatsSummary::default();
    let mut margin_sum = 0.0;

    for product in products.values() {
        stats.total_revenue += product.revenue;
        stats.total_profit += product.profit;
        stats.total_quantity = stats.total_quantity.saturating_add(product.quantity);
        margin_sum += product.margin;
    }

    if !products.is_empty() {
        stats.avg_margin = margin_sum / products.len() as f64 * 100.0;
    }
    stats
}
