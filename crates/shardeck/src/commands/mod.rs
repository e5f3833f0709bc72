//! Command handlers.
//!
//! Each handler drives the `Dashboard` action surface and renders what it
//! returns or what the store holds. Handlers never write dashboard state.

pub mod config_cmd;
mod health;
mod metrics;
mod stats;
mod strategy;
mod users;
mod watch;

use shardeck_config::Resolved;
use shardeck_core::{Dashboard, DashboardState};

use crate::cli::Command;
use crate::error::CliError;
use crate::output::Printer;

/// What every service command needs.
pub struct Context {
    pub dashboard: Dashboard,
    /// Service root, for messages.
    pub url: String,
    pub printer: Printer,
}

impl Context {
    /// Error for a system that ended `Unhealthy`, carrying the store's
    /// last error.
    fn unhealthy(&self, state: &DashboardState) -> CliError {
        CliError::Unhealthy {
            url: self.url.clone(),
            reason: state
                .error
                .as_ref()
                .map_or_else(|| "no response".into(), |e| e.message.clone()),
        }
    }
}

pub async fn dispatch(cmd: Command, resolved: Resolved, printer: Printer) -> Result<(), CliError> {
    let mut tuning = resolved.dashboard;
    if let Command::Watch(args) = &cmd {
        if let Some(interval) = args.interval {
            tuning.poll_interval = interval;
        }
    }

    let ctx = Context {
        dashboard: Dashboard::from_config(&resolved.transport, tuning)?,
        url: resolved.transport.base_url.to_string(),
        printer,
    };

    tracing::debug!(command = ?cmd, "dispatching command");
    match cmd {
        Command::Health => health::handle(&ctx).await,
        Command::Stats => stats::handle(&ctx).await,
        Command::Watch(args) => watch::handle(&ctx, &args).await,
        Command::Strategy(args) => strategy::handle(&ctx, args).await,
        Command::Users(args) => users::handle(&ctx, args).await,
        Command::Metrics => metrics::handle(&ctx).await,
        Command::Config(_) | Command::Completions(_) => {
            unreachable!("handled before dispatch")
        }
    }
}
