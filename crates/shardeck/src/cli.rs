//! Clap derive structures for the `shardeck` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This
//! file is also compiled by `build.rs` for man page generation, so it
//! depends on nothing but clap, clap_complete and humantime.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// shardeck -- dashboard and admin CLI for a sharded PostgreSQL service
#[derive(Debug, Parser)]
#[command(
    name = "shardeck",
    version,
    about = "Monitor and manage a sharded PostgreSQL service from the command line",
    long_about = "Monitor and manage a sharded PostgreSQL service from the command line.\n\n\
        Probes the service health endpoint with bounded retries, aggregates\n\
        shard and user statistics into one snapshot, and exposes strategy,\n\
        user and monitoring operations of the /api/v1 contract.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "SHARDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service root URL including the API prefix (overrides profile)
    #[arg(long, short = 'u', env = "SHARDECK_URL", global = true)]
    pub url: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "SHARDECK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (1-120)
    #[arg(
        long,
        env = "SHARDECK_TIMEOUT",
        global = true,
        value_parser = clap::value_parser!(u64).range(1..=120)
    )]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe the service health endpoint (with retries)
    Health,

    /// Connect and print one statistics snapshot
    #[command(alias = "dash")]
    Stats,

    /// Connect and print every dashboard update until Ctrl-C
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// View or change the sharding strategy
    Strategy(StrategyArgs),

    /// Create and look up users
    #[command(alias = "u")]
    Users(UsersArgs),

    /// Show per-strategy performance metrics
    Metrics,

    /// Inspect CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Also run the performance metrics monitor
    #[arg(long, short = 'm')]
    pub metrics: bool,

    /// Stats refresh interval, e.g. "10s" or "2m" (overrides config)
    #[arg(long, short = 'i', value_parser = parse_interval)]
    pub interval: Option<Duration>,
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let interval = humantime::parse_duration(raw).map_err(|e| e.to_string())?;
    if interval.is_zero() {
        return Err("interval must be greater than zero".into());
    }
    Ok(interval)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STRATEGY
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StrategyArgs {
    #[command(subcommand)]
    pub command: StrategyCommand,
}

#[derive(Debug, Subcommand)]
pub enum StrategyCommand {
    /// Show the active sharding strategy
    Get,

    /// Switch the sharding strategy
    Set {
        /// Strategy to activate
        #[arg(ignore_case = true)]
        strategy: StrategyName,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyName {
    /// Hash of the shard key
    Hash,
    /// Key ranges
    Range,
    /// Explicit key lists
    List,
    /// Lookup directory
    Directory,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// Create a user
    Create {
        /// Unique username
        #[arg(long)]
        username: String,

        /// Email address
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        full_name: Option<String>,

        /// Key that decides the user's shard
        #[arg(long, short = 'k')]
        shard_key: String,
    },

    /// Fetch a user by numeric ID
    Get {
        /// User ID
        id: i64,
    },

    /// List users stored under a shard key
    ByKey {
        /// Shard key
        shard_key: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the loaded configuration and the active profile
    Show,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
