//! Config subcommand handlers. Neither touches the service.

use serde::Serialize;

use shardeck_config::{Config, Overrides};

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::error::CliError;
use crate::output::Printer;

#[derive(Serialize)]
struct PathReport {
    path: String,
    exists: bool,
}

#[derive(Serialize)]
struct ShowReport<'a> {
    path: String,
    active_profile: String,
    config: &'a Config,
}

pub fn handle(
    args: &ConfigArgs,
    config: &Config,
    overrides: &Overrides,
    printer: &Printer,
) -> Result<(), CliError> {
    let path = shardeck_config::config_path();

    let out = match args.command {
        ConfigCommand::Path => {
            let report = PathReport {
                path: path.display().to_string(),
                exists: path.exists(),
            };
            printer.single(&report, |r| r.path.clone())?
        }

        ConfigCommand::Show => {
            let report = ShowReport {
                path: path.display().to_string(),
                active_profile: config.active_profile_name(overrides),
                config,
            };
            let toml = config.to_toml()?;
            printer.single(&report, |r| {
                format!(
                    "{}\n{}",
                    printer.dim(&format!("# {} (active profile: {})", r.path, r.active_profile)),
                    toml.trim_end()
                )
            })?
        }
    };
    printer.print(&out);
    Ok(())
}
