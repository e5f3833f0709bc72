//! Strategy command handlers.

use serde::Serialize;

use shardeck_core::{Strategy, StrategyUpdate};

use super::Context;
use crate::cli::{StrategyArgs, StrategyCommand, StrategyName};
use crate::error::CliError;

fn to_strategy(name: StrategyName) -> Strategy {
    match name {
        StrategyName::Hash => Strategy::Hash,
        StrategyName::Range => Strategy::Range,
        StrategyName::List => Strategy::List,
        StrategyName::Directory => Strategy::Directory,
    }
}

#[derive(Serialize)]
struct StrategyReport {
    current_strategy: String,
    changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

pub async fn handle(ctx: &Context, args: StrategyArgs) -> Result<(), CliError> {
    let report = match args.command {
        StrategyCommand::Get => StrategyReport {
            current_strategy: ctx.dashboard.current_strategy().await?,
            changed: false,
            message: None,
        },
        StrategyCommand::Set { strategy } => {
            // The no-op check compares against the latest snapshot.
            if let Err(err) = ctx.dashboard.refresh_data().await {
                tracing::debug!(error = %err, "snapshot unavailable before strategy change");
            }
            match ctx.dashboard.set_strategy(to_strategy(strategy)).await? {
                StrategyUpdate::Unchanged(active) => StrategyReport {
                    current_strategy: active.to_string(),
                    changed: false,
                    message: Some(format!("Strategy '{active}' is already active")),
                },
                StrategyUpdate::Changed(change) => StrategyReport {
                    message: Some(if change.message.is_empty() {
                        format!("Strategy changed to '{}'", change.current_strategy)
                    } else {
                        change.message
                    }),
                    current_strategy: change.current_strategy,
                    changed: true,
                },
            }
        }
    };

    let out = ctx.printer.single(&report, |r| match &r.message {
        Some(message) => message.clone(),
        None => format!("Current strategy: {}", r.current_strategy),
    })?;
    ctx.printer.print(&out);
    Ok(())
}
