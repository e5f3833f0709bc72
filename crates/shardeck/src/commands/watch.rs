//! `shardeck watch`: live dashboard until Ctrl-C.
//!
//! Prints the store after every change. In JSON mode each update is one
//! compact line, so the stream can be piped into `jq`.

use chrono::Local;
use tracing::warn;

use shardeck_core::{DashboardState, RequestStatus, SystemStatus};

use super::Context;
use super::metrics::render_metrics;
use super::stats::{DashboardReport, render_dashboard};
use crate::cli::{OutputFormat, WatchArgs};
use crate::error::CliError;

fn print_state(ctx: &Context, state: &DashboardState) -> Result<(), CliError> {
    let out = match ctx.printer.format {
        OutputFormat::Json => serde_json::to_string(&DashboardReport::new(state))?,
        OutputFormat::Table => format!(
            "{}\n{}\n",
            ctx.printer
                .dim(&format!("── {} ──", Local::now().format("%H:%M:%S"))),
            render_dashboard(&ctx.printer, state)
        ),
    };
    ctx.printer.print(&out);
    Ok(())
}

pub async fn handle(ctx: &Context, args: &WatchArgs) -> Result<(), CliError> {
    let dashboard = &ctx.dashboard;
    let mut state_rx = dashboard.subscribe();
    let mut metrics_rx = dashboard.subscribe_metrics();

    let status = dashboard.init().await;
    if !matches!(status, Ok(SystemStatus::Healthy)) {
        let state = dashboard.state();
        dashboard.teardown();
        status?;
        return Err(ctx.unhealthy(&state));
    }

    if args.metrics && !dashboard.start_metrics_monitor() {
        warn!("metrics monitor not started: metrics interval is zero");
    }

    let initial = state_rx.borrow_and_update().clone();
    print_state(ctx, &initial)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            signal = &mut ctrl_c => break signal.map_err(CliError::from),

            changed = state_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let state = state_rx.borrow_and_update().clone();
                if let Err(err) = print_state(ctx, &state) {
                    break Err(err);
                }
            }

            changed = metrics_rx.changed(), if args.metrics => {
                if changed.is_err() {
                    break Ok(());
                }
                let metrics = metrics_rx.borrow_and_update().clone();
                if metrics.status != RequestStatus::Success {
                    continue;
                }
                let Some(data) = metrics.data else { continue };
                let out = match ctx.printer.format {
                    OutputFormat::Json => match serde_json::to_string(&data) {
                        Ok(line) => line,
                        Err(err) => break Err(err.into()),
                    },
                    OutputFormat::Table => render_metrics(&ctx.printer, &data),
                };
                ctx.printer.print(&out);
            }
        }
    };

    dashboard.teardown();
    result
}
