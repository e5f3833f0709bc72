mod cli;
mod commands;
mod error;
mod output;

use clap::{CommandFactory, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use shardeck_config::{Config, Overrides};

use crate::cli::{Cli, Command, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::Printer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;

    match command {
        // Completions never read the config file
        Command::Completions(args) => {
            let mut cmd = Cli::command();
            clap_complete::generate(args.shell, &mut cmd, "shardeck", &mut std::io::stdout());
            Ok(())
        }

        Command::Config(args) => {
            let config = shardeck_config::load_config()?;
            let printer = printer(&global, &config)?;
            commands::config_cmd::handle(&args, &config, &overrides(&global), &printer)
        }

        cmd => {
            let config = shardeck_config::load_config()?;
            let printer = printer(&global, &config)?;
            let resolved = config.resolve(&overrides(&global))?;
            tracing::debug!(
                profile = %resolved.profile,
                url = %resolved.transport.base_url,
                "resolved configuration"
            );
            commands::dispatch(cmd, resolved, printer).await
        }
    }
}

fn overrides(global: &GlobalOpts) -> Overrides {
    Overrides {
        profile: global.profile.clone(),
        url: global.url.clone(),
        timeout: global.timeout,
    }
}

/// Output settings: `--output` flag, else the config file's default.
fn printer(global: &GlobalOpts, config: &Config) -> Result<Printer, CliError> {
    let format = match global.output {
        Some(format) => format,
        None => OutputFormat::from_str(&config.defaults.output, true).map_err(|_| {
            CliError::Validation {
                field: "defaults.output".into(),
                reason: format!(
                    "expected 'table' or 'json', got '{}'",
                    config.defaults.output
                ),
            }
        })?,
    };
    Ok(Printer {
        format,
        color: output::should_color(global.color),
        quiet: global.quiet,
    })
}
