// ── Request slot state ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorInfo;

/// Lifecycle of one operation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Observable state of one slot.
///
/// `data` keeps the last successful result across later loads and errors,
/// so a failed refresh never blanks what was already shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestState<T> {
    pub status: RequestStatus,
    pub error: Option<ErrorInfo>,
    pub started_at: Option<DateTime<Utc>>,
    pub generation: u64,
    pub data: Option<T>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            status: RequestStatus::Idle,
            error: None,
            started_at: None,
            generation: 0,
            data: None,
        }
    }
}
