//! Day-bucketed revenue and profit series.

use crate::normalize::{date_field, number_field, Field};
use crate::record::RawRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateBucket {
    /// `YYYY-MM-DD`, UTC calendar day
    pub date: String,
    pub revenue: f64,
    pub profit: f64,
}

/// Group rows by sale day and sum revenue/profit per day, ascending by
/// date. Rows without a parseable date are skipped.
pub fn revenue_by_date(rows: &[RawRecord]) -> Vec<DateBucket> {
    // NaiveDate ordering is chronological and matches the ISO string order
    let mut buckets: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();

    for row in rows {
        let Some(day) = date_field(row, Field::SaleDate) else {
            continue;
        };
        let entry = buckets.entry(day).or_insert((0.0, 0.0));
        entry.0 += number_field(row, Field::Revenue);
        entry.1 += number_field(row, Field::Profit);
    }

    buckets
        .into_iter()
        .map(|(day, (revenue, profit))| DateBucket {
            date: day.format("%Y-%m-%d").to_string(),
            revenue,
            profit,
        })
        .collect()
}
