//! `shardeck stats`: connect, take one snapshot, tear down.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::Tabled;

use shardeck_core::{DashboardState, ShardShare, StatsSnapshot, SystemStatus};

use super::Context;
use crate::error::CliError;
use crate::output::{self, Printer};

#[derive(Tabled)]
struct ShareRow {
    #[tabled(rename = "Shard")]
    shard: String,
    #[tabled(rename = "Users")]
    users: u64,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "DB size (MB)")]
    db_size: String,
}

fn share_row(snapshot: &StatsSnapshot, share: &ShardShare) -> ShareRow {
    let db_size = snapshot
        .shard_stats
        .shards
        .get(&share.shard)
        .map_or_else(|| "-".into(), |s| format!("{:.2}", s.db_size_mb));
    ShareRow {
        shard: share.shard.clone(),
        users: share.users,
        share: output::percent(share.percent),
        db_size,
    }
}

/// JSON shape of the dashboard.
#[derive(Serialize)]
pub(super) struct DashboardReport<'a> {
    status: SystemStatus,
    last_update: Option<DateTime<Utc>>,
    error: Option<&'a str>,
    snapshot: Option<&'a StatsSnapshot>,
    distribution: Vec<ShardShare>,
}

impl<'a> DashboardReport<'a> {
    pub(super) fn new(state: &'a DashboardState) -> Self {
        Self {
            status: state.status,
            last_update: state.last_update,
            error: state.error.as_ref().map(|e| e.message.as_str()),
            snapshot: state.snapshot.as_deref(),
            distribution: state
                .snapshot
                .as_ref()
                .map(|s| s.distribution())
                .unwrap_or_default(),
        }
    }
}

/// Human view: status line, totals, and the distribution table.
pub(super) fn render_dashboard(printer: &Printer, state: &DashboardState) -> String {
    let mut out = String::new();
    let updated = output::last_update_text(state.last_update, Utc::now());
    let _ = writeln!(
        out,
        "Status: {}  {}",
        printer.status(state.status),
        printer.dim(&format!("(updated {updated})"))
    );
    if let Some(err) = &state.error {
        let _ = writeln!(out, "{}", printer.error(&format!("Error: {}", err.message)));
    }

    match &state.snapshot {
        Some(snapshot) => {
            let _ = writeln!(out, "Strategy: {}", snapshot.strategy());
            let _ = writeln!(out, "Shards:   {}", snapshot.total_shards());
            let _ = writeln!(out, "Users:    {}", snapshot.total_users());
            let rows: Vec<ShareRow> = snapshot
                .distribution()
                .iter()
                .map(|share| share_row(snapshot, share))
                .collect();
            out.push_str(&output::render_table(&rows));
        }
        None => out.push_str(&printer.dim("No statistics yet.")),
    }
    out
}

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let dashboard = &ctx.dashboard;
    let status = dashboard.init().await;
    let state = dashboard.state();
    dashboard.teardown();

    if status? == SystemStatus::Unhealthy {
        return Err(ctx.unhealthy(&state));
    }
    if state.snapshot.is_none() {
        if let Some(err) = &state.error {
            return Err(err.clone().into());
        }
    }

    let out = ctx
        .printer
        .single(&DashboardReport::new(&state), |_| render_dashboard(&ctx.printer, &state))?;
    ctx.printer.print(&out);
    Ok(())
}
