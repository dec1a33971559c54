//! Text rendering of a snapshot for the terminal.

use analytics::format::{format_currency, format_number, format_percent};
use analytics::views::{
    agents_by_revenue, chart_window, clients_by_revenue, filter_products, top_agents, top_products,
    ClientRow, RankTier, TOP_LIMIT,
};
use analytics::{AgentSummary, DateBucket, ProductSummary, Snapshot, StatsSummary};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt::Write;

const BAR_WIDTH: usize = 24;

/// JSON shape of `report --json`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport<'a> {
    snapshot_id: String,
    source: &'a str,
    loaded_at: DateTime<Utc>,
    row_count: usize,
    stats: StatsSummary,
    categories: &'a [String],
    top_products: Vec<&'a ProductSummary>,
    top_agents: Vec<&'a AgentSummary>,
    chart: &'a [DateBucket],
}

impl<'a> DashboardReport<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot_id: snapshot.snapshot_id.to_string(),
            source: &snapshot.source,
            loaded_at: snapshot.loaded_at,
            row_count: snapshot.row_count,
            stats: snapshot.stats,
            categories: &snapshot.categories,
            top_products: top_products(&snapshot.products, TOP_LIMIT),
            top_agents: top_agents(&snapshot.agents, TOP_LIMIT),
            chart: chart_window(&snapshot.revenue_by_date),
        }
    }
}

fn rank_marker(index: usize) -> &'static str {
    match RankTier::for_rank(index) {
        RankTier::Gold => "[gold]  ",
        RankTier::Silver => "[silver]",
        RankTier::Bronze => "[bronze]",
        RankTier::Default => "        ",
    }
}

fn header(out: &mut String, snapshot: &Snapshot) {
    if snapshot.row_count == 0 {
        let _ = writeln!(out, "No data loaded. Use --file or `load <path>` to open a sales export.");
    } else {
        let _ = writeln!(
            out,
            "Source: {} ({} rows, loaded {})",
            snapshot.source,
            snapshot.row_count,
            snapshot.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
}

fn stats_block(out: &mut String, stats: &StatsSummary) {
    let _ = writeln!(out, "\n=== Summary ===");
    let _ = writeln!(out, "  Revenue:    {}", format_currency(stats.total_revenue));
    let _ = writeln!(out, "  Profit:     {}", format_currency(stats.total_profit));
    let _ = writeln!(out, "  Quantity:   {}", format_number(stats.total_quantity as f64));
    let _ = writeln!(out, "  Avg margin: {}", format_percent(stats.avg_margin));
}

/// Day label for the chart axis, e.g. `5 Mar`
fn day_label(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%-d %b").to_string())
        .unwrap_or_else(|_| date.to_string())
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.clamp(1, BAR_WIDTH))
}

fn chart_block(out: &mut String, series: &[DateBucket]) {
    let _ = writeln!(out, "\n=== Revenue, last {} days ===", series.len());
    if series.is_empty() {
        let _ = writeln!(out, "  (no dated sales)");
        return;
    }
    let max = series.iter().map(|b| b.revenue).fold(0.0, f64::max);
    for bucket in series {
        let _ = writeln!(
            out,
            "  {:>6}  {:>8}  {:>8}  {}",
            day_label(&bucket.date),
            format_currency(bucket.revenue),
            format_currency(bucket.profit),
            bar(bucket.revenue, max)
        );
    }
}

pub fn dashboard(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    header(&mut out, snapshot);
    stats_block(&mut out, &snapshot.stats);

    let _ = writeln!(out, "\n=== Top products by profit ===");
    for (i, p) in top_products(&snapshot.products, TOP_LIMIT).iter().enumerate() {
        let _ = writeln!(
            out,
            "  {} {}. {} ({}) {}",
            rank_marker(i),
            i + 1,
            p.name,
            p.category,
            format_currency(p.profit)
        );
    }

    let _ = writeln!(out, "\n=== Top agents by revenue ===");
    for (i, a) in top_agents(&snapshot.agents, TOP_LIMIT).iter().enumerate() {
        let _ = writeln!(
            out,
            "  {} {}. {} ({} sales) {}",
            rank_marker(i),
            i + 1,
            a.name,
            a.sales,
            format_currency(a.revenue)
        );
    }

    chart_block(&mut out, chart_window(&snapshot.revenue_by_date));
    out
}

pub fn products(snapshot: &Snapshot, query: &str, limit: usize) -> String {
    let mut out = String::new();
    let matching = filter_products(&snapshot.products, query);
    if query.is_empty() {
        let _ = writeln!(out, "=== Products ({}) ===", matching.len());
    } else {
        let _ = writeln!(out, "=== Products matching '{}' ({}) ===", query, matching.len());
    }
    for p in matching.iter().take(limit) {
        let _ = writeln!(out, "  {}", p.name);
        let _ = writeln!(
            out,
            "    {} | qty {} | revenue {} | profit {}{}",
            p.category,
            format_number(p.quantity as f64),
            format_currency(p.revenue),
            format_currency(p.profit),
            if p.profit < 0.0 { " (loss)" } else { "" }
        );
    }
    if matching.len() > limit {
        let _ = writeln!(out, "  ... and {} more", matching.len() - limit);
    }
    out
}

pub fn agents(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let list = agents_by_revenue(&snapshot.agents);
    let _ = writeln!(out, "=== Agents ({}) ===", list.len());
    for a in list {
        let _ = writeln!(
            out,
            "  {:<24} sales {:>5} | revenue {:>8} | profit {:>8}",
            a.name,
            a.sales,
            format_currency(a.revenue),
            format_currency(a.profit)
        );
    }
    out
}

pub fn clients(snapshot: &Snapshot, limit: usize) -> String {
    let mut out = String::new();
    let rows: Vec<ClientRow<'_>> = clients_by_revenue(&snapshot.clients, limit);
    let _ = writeln!(out, "=== Clients (top {} of {}) ===", rows.len(), snapshot.clients.len());
    for row in rows {
        let _ = writeln!(
            out,
            "  {:<24} purchases {:>4} | total {:>8} | profit {:>8} | avg {:>8}",
            row.client.name,
            row.client.purchases,
            format_currency(row.client.revenue),
            format_currency(row.client.profit),
            format_currency(row.average_check)
        );
    }
    out
}

pub fn categories(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Categories ({}) ===", snapshot.categories.len());
    for category in &snapshot.categories {
        let _ = writeln!(out, "  {}", category);
    }
    out
}

pub fn series(snapshot: &Snapshot, all: bool) -> String {
    let mut out = String::new();
    let buckets = if all {
        &snapshot.revenue_by_date[..]
    } else {
        chart_window(&snapshot.revenue_by_date)
    };
    let _ = writeln!(out, "date        revenue        profit");
    for b in buckets {
        let _ = writeln!(out, "{}  {:>12.2}  {:>12.2}", b.date, b.revenue, b.profit);
    }
    out
}
