//! Request orchestration and observable state between `shardeck-api` and
//! its consumers (the CLI).
//!
//! - **[`Dashboard`]**: facade owning the full lifecycle.
//!   [`init()`](Dashboard::init) probes the service and, once healthy,
//!   fetches a snapshot and starts the refresh timer.
//!   [`teardown()`](Dashboard::teardown) stops every timer and makes calls
//!   still in flight unable to commit.
//!
//! - **[`RequestExecutor`]**: one per operation slot. Each call advances
//!   the slot's generation in a shared [`GenerationMap`]; only the newest
//!   call may commit, superseded ones settle as
//!   [`ErrorKind::Aborted`] without touching state.
//!
//! - **[`HealthProbe`]**: bounded fixed-delay retry driven by the pure
//!   [`ProbeState`] machine, with an injectable [`Sleeper`].
//!
//! - **Stats poller** ([`fetch_snapshot`], [`PollingSchedule`]): fetches
//!   shard and user statistics concurrently and joins them into one
//!   immutable [`StatsSnapshot`], all-or-nothing.
//!
//! - **[`DashboardStore`]**: `tokio::sync::watch`-backed
//!   [`DashboardState`] (status, snapshot, last update, error) that
//!   consumers read and subscribe to.

pub mod backend;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod poller;
pub mod probe;
pub mod request;
pub mod store;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_support;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backend::ShardBackend;
pub use config::{DashboardConfig, ProbePolicy};
pub use dashboard::{Dashboard, DashboardBuilder, StrategyUpdate};
pub use error::{CoreError, ErrorInfo, ErrorKind};
pub use poller::{PollingSchedule, ShardShare, StatsSnapshot, fetch_snapshot};
pub use probe::{HealthProbe, ProbeEvent, ProbeState, ProbeVerdict, Sleeper, TokioSleeper};
pub use request::{GenerationMap, RequestExecutor, RequestState, RequestStatus, Slot, Ticket};
pub use store::{DashboardState, DashboardStore, SystemStatus};

// Wire types consumers need alongside the dashboard.
pub use shardeck_api::{
    CurrentStrategy, HealthResponse, Metrics, NewUser, ShardStats, ShardsInfo, Strategy,
    StrategyChange, StrategyPerformance, TransportConfig, User, UserStats,
};
