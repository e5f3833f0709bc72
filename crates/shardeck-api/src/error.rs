use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the `shardeck-api` crate.
///
/// Every failure the transport can observe lands in one of these variants.
/// Higher layers never inspect them directly: they call [`Error::kind`]
/// once and carry the resulting [`ErrorKind`] from then on.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// The connection could not be established (refused, DNS failure, reset).
    #[error("Cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// Request exceeded the configured deadline.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Any other `reqwest` failure (body decoding, redirect loops, ...).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or client construction error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Service responses ───────────────────────────────────────────
    /// The service answered 404.
    #[error("Not found: {path}")]
    NotFound { path: String },

    /// The service answered with a structured `{"detail": ...}` payload.
    #[error("Service error (HTTP {status}): {detail}")]
    Server { status: u16, detail: String },

    /// Non-success status without a structured payload.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Health endpoint answered, but not with `status: "healthy"`.
    #[error("Service reported status '{status}'")]
    Unhealthy { status: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Classified failure, independent of how the transport observed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, strum::IntoStaticStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Connection could not be established.
    NetworkUnreachable,
    /// Request exceeded the configured deadline.
    Timeout,
    /// Remote responded 404.
    NotFound,
    /// Remote responded with a structured error payload.
    ServerValidation { detail: String },
    /// Anything else.
    Unknown,
    /// Superseded by a newer call for the same slot. Never produced by
    /// [`Error::kind`]; the request executor assigns it.
    Aborted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl Error {
    /// Classify this error into the closed [`ErrorKind`] taxonomy.
    ///
    /// Order matters for `Transport`: timeouts and connect failures are
    /// recognised before a status code is considered.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. } => ErrorKind::NetworkUnreachable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Transport(e) if e.is_timeout() => ErrorKind::Timeout,
            Self::Transport(e) if e.is_connect() => ErrorKind::NetworkUnreachable,
            Self::Transport(e) if e.status() == Some(reqwest::StatusCode::NOT_FOUND) => {
                ErrorKind::NotFound
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Server { detail, .. } => ErrorKind::ServerValidation {
                detail: detail.clone(),
            },
            Self::Transport(_)
            | Self::InvalidUrl(_)
            | Self::Tls(_)
            | Self::Http { .. }
            | Self::Unhealthy { .. }
            | Self::Deserialization { .. } => ErrorKind::Unknown,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NetworkUnreachable | ErrorKind::Timeout
        )
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// HTTP status code, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_detail_classifies_as_server_validation() {
        let err = Error::Server {
            status: 400,
            detail: "Unknown strategy: ring".into(),
        };
        assert_eq!(
            err.kind(),
            ErrorKind::ServerValidation {
                detail: "Unknown strategy: ring".into()
            }
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn unstructured_failures_are_unknown() {
        let http = Error::Http {
            status: 502,
            body: "Bad Gateway".into(),
        };
        let unhealthy = Error::Unhealthy {
            status: "degraded".into(),
        };
        assert_eq!(http.kind(), ErrorKind::Unknown);
        assert_eq!(unhealthy.kind(), ErrorKind::Unknown);
        assert!(!http.is_transient());
    }

    #[test]
    fn connect_and_timeout_are_transient() {
        let connect = Error::Connect {
            url: "http://localhost:1/api/v1/health".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(connect.kind(), ErrorKind::NetworkUnreachable);
        assert!(connect.is_transient());
        assert!(Error::Timeout { timeout_secs: 10 }.is_transient());
    }

    #[test]
    fn kind_names_are_snake_case() {
        assert_eq!(ErrorKind::NetworkUnreachable.as_str(), "network_unreachable");
        assert_eq!(
            ErrorKind::ServerValidation {
                detail: String::new()
            }
            .as_str(),
            "server_validation"
        );
    }
}
