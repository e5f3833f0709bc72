//! `shardeck metrics`: one performance snapshot.

use std::fmt::Write;

use tabled::Tabled;

use shardeck_core::Metrics;

use super::Context;
use crate::error::CliError;
use crate::output::{self, Printer};

#[derive(Tabled)]
struct PerformanceRow {
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Operations")]
    operations: u64,
    #[tabled(rename = "Avg (ms)")]
    average_ms: String,
    #[tabled(rename = "Total (s)")]
    total_secs: String,
}

#[derive(Tabled)]
struct ShardRow {
    #[tabled(rename = "Shard")]
    shard: String,
    #[tabled(rename = "Users")]
    users: u64,
    #[tabled(rename = "DB size (MB)")]
    db_size: String,
}

pub(super) fn render_metrics(printer: &Printer, metrics: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Strategy: {}", metrics.current_strategy);
    let average = metrics
        .average_response_ms()
        .map_or_else(|| printer.dim("n/a"), |ms| format!("{ms:.2} ms"));
    let _ = writeln!(out, "Average response: {average}");

    let perf: Vec<PerformanceRow> = metrics
        .performance_metrics
        .iter()
        .map(|(name, p)| PerformanceRow {
            strategy: name.clone(),
            operations: p.total_operations,
            average_ms: format!("{:.2}", p.average_time_ms),
            total_secs: format!("{:.3}", p.total_time_seconds),
        })
        .collect();
    if !perf.is_empty() {
        let _ = writeln!(out, "{}", output::render_table(&perf));
    }

    let shards: Vec<ShardRow> = metrics
        .shard_statistics
        .iter()
        .map(|(name, s)| ShardRow {
            shard: name.clone(),
            users: s.user_count,
            db_size: format!("{:.2}", s.db_size_mb),
        })
        .collect();
    if !shards.is_empty() {
        out.push_str(&output::render_table(&shards));
    }
    out.trim_end().to_owned()
}

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let metrics = ctx.dashboard.metrics().await?;
    let out = ctx
        .printer
        .single(&metrics, |m| render_metrics(&ctx.printer, m))?;
    ctx.printer.print(&out);
    Ok(())
}
