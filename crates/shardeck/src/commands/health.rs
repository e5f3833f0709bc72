//! `shardeck health`: probe only, no stats and no polling.

use chrono::{DateTime, Utc};
use serde::Serialize;

use shardeck_core::{ProbeVerdict, SystemStatus};

use super::Context;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct HealthReport<'a> {
    url: &'a str,
    status: SystemStatus,
    max_attempts: u32,
    checked_at: DateTime<Utc>,
}

pub async fn handle(ctx: &Context) -> Result<(), CliError> {
    let policy = ctx.dashboard.config().probe;

    match ctx.dashboard.probe().await {
        ProbeVerdict::Healthy => {
            let report = HealthReport {
                url: &ctx.url,
                status: SystemStatus::Healthy,
                max_attempts: policy.max_attempts,
                checked_at: Utc::now(),
            };
            let out = ctx.printer.single(&report, |r| {
                format!("{}  {}", ctx.printer.status(r.status), r.url)
            })?;
            ctx.printer.print(&out);
            Ok(())
        }
        ProbeVerdict::Unhealthy(err) => Err(CliError::Unhealthy {
            url: ctx.url.clone(),
            reason: err.message,
        }),
        ProbeVerdict::Superseded => Err(CliError::Api {
            message: "health check was superseded".into(),
        }),
    }
}
