// ── Core error types ──
//
// `ErrorInfo` is the classified, immutable record of one failed request.
// It is built exactly once from a `shardeck_api::Error` and carried
// opaquely from then on. `CoreError` covers everything that is not a
// request outcome: illegal state transitions, configuration, setup.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use shardeck_api::ErrorKind;

use crate::request::Slot;
use crate::store::SystemStatus;

const UNREACHABLE_MESSAGE: &str =
    "Cannot connect to server. Please check if the backend is running.";
const TIMEOUT_MESSAGE: &str = "Request timeout. Server is taking too long to respond.";
const NOT_FOUND_MESSAGE: &str = "Endpoint not found. Please check the API URL.";
const UNKNOWN_MESSAGE: &str = "Unknown error occurred";

/// A classified request failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// User-facing message.
    pub message: String,
    pub kind: ErrorKind,
    pub occurred_at: DateTime<Utc>,
    /// The unclassified error text, for diagnostics.
    pub raw: String,
}

impl ErrorInfo {
    /// Record for a call whose outcome was discarded because a newer call
    /// for the same slot had started. Never stored in visible state.
    pub fn aborted(slot: Slot) -> Self {
        Self {
            message: "request superseded".into(),
            kind: ErrorKind::Aborted,
            occurred_at: Utc::now(),
            raw: format!("{slot} call superseded by a newer call"),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::Aborted
    }
}

impl From<shardeck_api::Error> for ErrorInfo {
    fn from(err: shardeck_api::Error) -> Self {
        let raw = err.to_string();
        let kind = err.kind();
        let message = match &kind {
            ErrorKind::NetworkUnreachable => UNREACHABLE_MESSAGE.to_owned(),
            ErrorKind::Timeout => TIMEOUT_MESSAGE.to_owned(),
            ErrorKind::NotFound => NOT_FOUND_MESSAGE.to_owned(),
            ErrorKind::ServerValidation { detail } => detail.clone(),
            ErrorKind::Unknown | ErrorKind::Aborted if raw.is_empty() => UNKNOWN_MESSAGE.to_owned(),
            ErrorKind::Unknown | ErrorKind::Aborted => raw.clone(),
        };
        Self {
            message,
            kind,
            occurred_at: Utc::now(),
            raw,
        }
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorInfo {}

/// Unified error type for non-request failures in the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: SystemStatus, to: SystemStatus },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Cannot build service client: {0}")]
    Client(#[from] shardeck_api::Error),
}
