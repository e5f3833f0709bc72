// ── Global dashboard state ──
//
// Single `watch` channel holding status, snapshot, last update and error.
// Only the orchestration code in this crate writes to it; consumers read
// and subscribe. Writes that belong to a probe run are checked against the
// run's ticket under the channel's write lock.

mod status;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{CoreError, ErrorInfo};
use crate::poller::StatsSnapshot;
use crate::probe::ProbeVerdict;
use crate::request::{GenerationMap, Slot, Ticket};

pub use status::SystemStatus;

/// Everything a consumer can observe about the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    pub status: SystemStatus,
    pub snapshot: Option<Arc<StatsSnapshot>>,
    pub last_update: Option<DateTime<Utc>>,
    pub error: Option<ErrorInfo>,
}

/// Owner of the [`DashboardState`] channel.
pub struct DashboardStore {
    state: watch::Sender<DashboardState>,
    generations: Arc<GenerationMap>,
}

impl std::fmt::Debug for DashboardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardStore")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl DashboardStore {
    pub fn new(generations: Arc<GenerationMap>) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self { state, generations }
    }

    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    pub fn status(&self) -> SystemStatus {
        self.state.borrow().status
    }

    pub fn snapshot(&self) -> Option<Arc<StatsSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn error(&self) -> Option<ErrorInfo> {
        self.state.borrow().error.clone()
    }

    pub fn generations(&self) -> &Arc<GenerationMap> {
        &self.generations
    }

    // ── Writes (crate only) ──────────────────────────────────────────

    /// Enter `Checking` on behalf of the probe run `run`.
    ///
    /// Clears the error: while checking, individual attempt failures stay
    /// internal. Returns `Ok(false)` if `run` is stale or the store is
    /// already checking.
    pub(crate) fn enter_checking(&self, run: &Ticket) -> Result<bool, CoreError> {
        self.transition(run, SystemStatus::Checking, |s| s.error = None)
    }

    /// Record the verdict of probe run `run`.
    pub(crate) fn settle_probe(
        &self,
        run: &Ticket,
        verdict: &ProbeVerdict,
    ) -> Result<bool, CoreError> {
        match verdict {
            ProbeVerdict::Healthy => {
                self.transition(run, SystemStatus::Healthy, |s| s.error = None)
            }
            ProbeVerdict::Unhealthy(err) => self.transition(run, SystemStatus::Unhealthy, |s| {
                s.error = Some(err.clone());
            }),
            ProbeVerdict::Superseded => Ok(false),
        }
    }

    fn transition(
        &self,
        run: &Ticket,
        to: SystemStatus,
        apply: impl FnOnce(&mut DashboardState),
    ) -> Result<bool, CoreError> {
        let mut illegal = None;
        let changed = self.state.send_if_modified(|s| {
            if !self.generations.is_current(run) || s.status == to {
                return false;
            }
            if !s.status.can_transition_to(to) {
                illegal = Some(s.status);
                return false;
            }
            debug!(from = %s.status, to = %to, "status transition");
            s.status = to;
            apply(s);
            true
        });
        match illegal {
            Some(from) => Err(CoreError::IllegalTransition { from, to }),
            None => Ok(changed),
        }
    }

    /// Replace the snapshot wholesale and advance `last_update`.
    ///
    /// Called from inside the stats executor's commit, so it only ever
    /// sees the newest fetch.
    pub(crate) fn publish_snapshot(&self, snapshot: Arc<StatsSnapshot>) {
        self.state.send_modify(|s| {
            s.last_update = Some(snapshot.captured_at);
            s.snapshot = Some(snapshot);
            s.error = None;
        });
    }

    /// Surface a failure. Superseded calls are never shown.
    pub(crate) fn set_error(&self, error: &ErrorInfo) {
        if error.is_aborted() {
            return;
        }
        self.state.send_modify(|s| s.error = Some(error.clone()));
    }

    /// Clear the current error; status and snapshot are untouched.
    ///
    /// Returns whether an error was present. Without one nothing changes
    /// and subscribers are not notified.
    pub fn clear_error(&self) -> bool {
        self.state.send_if_modified(|s| s.error.take().is_some())
    }

    /// Invalidate every outstanding ticket, including any probe run.
    ///
    /// Runs under the write lock so a probe verdict is either committed
    /// before this or rejected after it.
    pub(crate) fn retire(&self) {
        self.state.send_if_modified(|_| {
            self.generations.invalidate_all();
            false
        });
        debug!(
            connection = self.generations.current(Slot::Connection),
            "store retired outstanding calls"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ErrorKind;
    use crate::test_support::{shards_info, user_stats};

    fn store() -> DashboardStore {
        DashboardStore::new(Arc::new(GenerationMap::new()))
    }

    fn failure() -> ErrorInfo {
        ErrorInfo::from(shardeck_api::Error::Timeout { timeout_secs: 10 })
    }

    fn snapshot() -> Arc<StatsSnapshot> {
        Arc::new(StatsSnapshot {
            shard_stats: shards_info(4, "hash"),
            user_stats: user_stats(120),
            captured_at: Utc::now(),
        })
    }

    #[test]
    fn starts_checking_and_empty() {
        let state = store().state();
        assert_eq!(state.status, SystemStatus::Checking);
        assert!(state.snapshot.is_none());
        assert!(state.last_update.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn verdicts_follow_legal_edges() {
        let store = store();
        let run = store.generations().issue(Slot::Connection);

        assert!(!store.enter_checking(&run).unwrap(), "already checking");
        assert!(store.settle_probe(&run, &ProbeVerdict::Unhealthy(failure())).unwrap());
        assert_eq!(store.status(), SystemStatus::Unhealthy);
        assert_eq!(store.error().map(|e| e.kind), Some(ErrorKind::Timeout));

        let retry = store.generations().issue(Slot::Connection);
        assert!(store.enter_checking(&retry).unwrap());
        assert!(store.error().is_none(), "checking hides the error");
        assert!(store.settle_probe(&retry, &ProbeVerdict::Healthy).unwrap());
        assert_eq!(store.status(), SystemStatus::Healthy);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let store = store();
        let run = store.generations().issue(Slot::Connection);
        store.settle_probe(&run, &ProbeVerdict::Healthy).unwrap();

        let err = store
            .settle_probe(&run, &ProbeVerdict::Unhealthy(failure()))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::IllegalTransition {
                from: SystemStatus::Healthy,
                to: SystemStatus::Unhealthy
            }
        ));
        assert_eq!(store.status(), SystemStatus::Healthy);
    }

    #[test]
    fn stale_run_cannot_commit() {
        let store = store();
        let stale = store.generations().issue(Slot::Connection);
        store.generations().issue(Slot::Connection);

        assert!(!store.settle_probe(&stale, &ProbeVerdict::Healthy).unwrap());
        assert_eq!(store.status(), SystemStatus::Checking);

        let run = store.generations().issue(Slot::Connection);
        store.retire();
        assert!(!store.settle_probe(&run, &ProbeVerdict::Healthy).unwrap());
    }

    #[test]
    fn publish_replaces_snapshot_and_clears_error() {
        let store = store();
        store.set_error(&failure());
        let snap = snapshot();
        store.publish_snapshot(Arc::clone(&snap));

        let state = store.state();
        assert_eq!(state.snapshot, Some(Arc::clone(&snap)));
        assert_eq!(state.last_update, Some(snap.captured_at));
        assert!(state.error.is_none());
    }

    #[test]
    fn aborted_errors_are_never_shown() {
        let store = store();
        store.set_error(&ErrorInfo::aborted(Slot::Stats));
        assert!(store.error().is_none());
    }

    #[test]
    fn clear_error_is_idempotent() {
        let store = store();
        let snap = snapshot();
        store.publish_snapshot(Arc::clone(&snap));
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        assert!(!store.clear_error());
        assert!(!rx.has_changed().unwrap(), "no-op clear must not notify");

        store.set_error(&failure());
        assert!(store.clear_error());
        assert!(!store.clear_error());

        let state = store.state();
        assert_eq!(state.status, SystemStatus::Checking);
        assert_eq!(state.snapshot, Some(snap));
        assert!(state.error.is_none());
    }
}
