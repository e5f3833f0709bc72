//! CLI error types with miette diagnostics.
//!
//! Maps classified request failures, configuration problems and core
//! errors into user-facing errors with help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use shardeck_config::ConfigError;
use shardeck_core::{CoreError, ErrorInfo, ErrorKind};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const SERVER_VALIDATION: i32 = 9;
    pub const UNHEALTHY: i32 = 10;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Service ──────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(
        code(shardeck::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Cause: {raw}\n\
             Override the address with --url or the profile's `url` key."
        )
    )]
    ConnectionFailed { message: String, raw: String },

    #[error("{message}")]
    #[diagnostic(
        code(shardeck::timeout),
        help("Increase the deadline with --timeout (max 120s) or check service load.")
    )]
    Timeout { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(shardeck::not_found),
        help("The service answered 404: {raw}")
    )]
    NotFound { message: String, raw: String },

    #[error("Service rejected the request: {detail}")]
    #[diagnostic(code(shardeck::server_validation))]
    ServerValidation { detail: String },

    #[error("Service at {url} is unhealthy")]
    #[diagnostic(
        code(shardeck::unhealthy),
        help(
            "All health attempts failed. Last error: {reason}\n\
             Try again with: shardeck health -v"
        )
    )]
    Unhealthy { url: String, reason: String },

    #[error("{message}")]
    #[diagnostic(code(shardeck::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(shardeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(shardeck::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Config file: run `shardeck config path`"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(shardeck::config))]
    Config(ConfigError),

    #[error(transparent)]
    #[diagnostic(code(shardeck::core))]
    Core(CoreError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot encode JSON output: {0}")]
    #[diagnostic(code(shardeck::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::ServerValidation { .. } => exit_code::SERVER_VALIDATION,
            Self::Unhealthy { .. } => exit_code::UNHEALTHY,
            Self::Validation { .. } | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ErrorInfo → CliError mapping ─────────────────────────────────────

impl From<ErrorInfo> for CliError {
    fn from(err: ErrorInfo) -> Self {
        match err.kind {
            ErrorKind::NetworkUnreachable => CliError::ConnectionFailed {
                message: err.message,
                raw: err.raw,
            },
            ErrorKind::Timeout => CliError::Timeout {
                message: err.message,
            },
            ErrorKind::NotFound => CliError::NotFound {
                message: err.message,
                raw: err.raw,
            },
            ErrorKind::ServerValidation { detail } => CliError::ServerValidation { detail },
            ErrorKind::Unknown | ErrorKind::Aborted => CliError::Api {
                message: err.message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            other => CliError::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            other => CliError::Core(other),
        }
    }
}
