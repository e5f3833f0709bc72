// ── Request executor ──
//
// Wraps one logical operation slot. Every call advances the slot's
// generation; when a call settles it may commit only if its generation is
// still current. The check and the state mutation happen under the same
// `watch` write lock, so a newer issuance can never interleave between them.

mod generation;
mod state;

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use generation::{GenerationMap, Slot, Ticket};
pub use state::{RequestState, RequestStatus};

use crate::error::ErrorInfo;

/// Latest-wins executor for one operation slot.
///
/// Only the outcome of the most recently issued call is ever committed.
/// Older calls still run to completion, but their results are discarded
/// and reported to the caller as [`ErrorKind::Aborted`](crate::ErrorKind::Aborted).
pub struct RequestExecutor<T> {
    slot: Slot,
    generations: Arc<GenerationMap>,
    state: watch::Sender<RequestState<T>>,
}

impl<T> std::fmt::Debug for RequestExecutor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("slot", &self.slot)
            .field("generation", &self.generations.current(self.slot))
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + Sync + 'static> RequestExecutor<T> {
    pub fn new(slot: Slot, generations: Arc<GenerationMap>) -> Self {
        let (state, _) = watch::channel(RequestState::default());
        Self {
            slot,
            generations,
            state,
        }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Current state of the slot.
    pub fn state(&self) -> RequestState<T> {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<RequestState<T>> {
        self.state.subscribe()
    }

    /// Run `op` as the slot's newest call.
    pub async fn execute<F>(&self, op: F) -> Result<T, ErrorInfo>
    where
        F: Future<Output = Result<T, shardeck_api::Error>>,
    {
        self.execute_then(op, |_| {}).await
    }

    /// Run `op` as the slot's newest call; `on_commit` runs inside the
    /// commit, only if this call is still current when it settles.
    ///
    /// Use `on_commit` to publish the outcome elsewhere atomically with the
    /// generation check.
    pub async fn execute_then<F, C>(&self, op: F, on_commit: C) -> Result<T, ErrorInfo>
    where
        F: Future<Output = Result<T, shardeck_api::Error>>,
        C: FnOnce(&Result<T, ErrorInfo>),
    {
        self.execute_as(op, T::clone, on_commit).await
    }

    /// Run an operation whose output differs from the slot's data.
    ///
    /// On a committed success `project` derives the stored data from the
    /// output; the caller gets the output itself.
    pub async fn execute_as<O, F, P, C>(
        &self,
        op: F,
        project: P,
        on_commit: C,
    ) -> Result<O, ErrorInfo>
    where
        F: Future<Output = Result<O, shardeck_api::Error>>,
        P: FnOnce(&O) -> T,
        C: FnOnce(&Result<O, ErrorInfo>),
    {
        let ticket = self.issue();
        let outcome = op.await.map_err(ErrorInfo::from);
        self.settle_as(ticket, outcome, project, on_commit)
    }

    /// Start a call: advance the generation and enter `Loading`.
    ///
    /// Clears any prior error; keeps the last good data.
    pub fn issue(&self) -> Ticket {
        let mut ticket = Ticket {
            slot: self.slot,
            generation: 0,
        };
        self.state.send_modify(|s| ticket = self.begin(s));
        debug!(slot = %self.slot, generation = ticket.generation, "request issued");
        ticket
    }

    /// Run `op` as the slot's newest call, bound to `session`.
    ///
    /// Once `session` is cancelled the call can neither start nor commit:
    /// it settles as aborted and `op` is never polled if it had not started.
    pub async fn execute_until<F, C>(
        &self,
        session: &CancellationToken,
        op: F,
        on_commit: C,
    ) -> Result<T, ErrorInfo>
    where
        F: Future<Output = Result<T, shardeck_api::Error>>,
        C: FnOnce(&Result<T, ErrorInfo>),
    {
        let mut issued = None;
        self.state.send_if_modified(|s| {
            if session.is_cancelled() {
                return false;
            }
            issued = Some(self.begin(s));
            true
        });
        let Some(ticket) = issued else {
            debug!(slot = %self.slot, "session ended, request not issued");
            return Err(ErrorInfo::aborted(self.slot));
        };
        debug!(slot = %self.slot, generation = ticket.generation, "request issued");

        let outcome = op.await.map_err(ErrorInfo::from);
        self.commit(ticket, outcome, T::clone, on_commit, || !session.is_cancelled())
    }

    fn begin(&self, s: &mut RequestState<T>) -> Ticket {
        let ticket = self.generations.issue(self.slot);
        s.status = RequestStatus::Loading;
        s.error = None;
        s.started_at = Some(Utc::now());
        s.generation = ticket.generation;
        ticket
    }

    /// Finish the call identified by `ticket`.
    ///
    /// A superseded call mutates nothing and returns an `Aborted` error,
    /// whatever its own outcome was.
    pub fn settle<C>(
        &self,
        ticket: Ticket,
        outcome: Result<T, ErrorInfo>,
        on_commit: C,
    ) -> Result<T, ErrorInfo>
    where
        C: FnOnce(&Result<T, ErrorInfo>),
    {
        self.settle_as(ticket, outcome, T::clone, on_commit)
    }

    pub fn settle_as<O, P, C>(
        &self,
        ticket: Ticket,
        outcome: Result<O, ErrorInfo>,
        project: P,
        on_commit: C,
    ) -> Result<O, ErrorInfo>
    where
        P: FnOnce(&O) -> T,
        C: FnOnce(&Result<O, ErrorInfo>),
    {
        self.commit(ticket, outcome, project, on_commit, || true)
    }

    fn commit<O, P, C, L>(
        &self,
        ticket: Ticket,
        outcome: Result<O, ErrorInfo>,
        project: P,
        on_commit: C,
        live: L,
    ) -> Result<O, ErrorInfo>
    where
        P: FnOnce(&O) -> T,
        C: FnOnce(&Result<O, ErrorInfo>),
        L: FnOnce() -> bool,
    {
        let committed = self.state.send_if_modified(|s| {
            if !self.generations.is_current(&ticket) || !live() {
                return false;
            }
            match &outcome {
                Ok(output) => {
                    s.status = RequestStatus::Success;
                    s.error = None;
                    s.data = Some(project(output));
                }
                Err(err) => {
                    s.status = RequestStatus::Error;
                    s.error = Some(err.clone());
                }
            }
            on_commit(&outcome);
            true
        });

        if committed {
            outcome
        } else {
            debug!(
                slot = %self.slot,
                generation = ticket.generation,
                current = self.generations.current(self.slot),
                "superseded result discarded"
            );
            Err(ErrorInfo::aborted(self.slot))
        }
    }

    /// Return to `Idle` and invalidate any call still in flight.
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            let ticket = self.generations.issue(self.slot);
            *s = RequestState {
                generation: ticket.generation,
                ..RequestState::default()
            };
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    use super::*;
    use crate::ErrorKind;

    fn executor() -> RequestExecutor<u32> {
        RequestExecutor::new(Slot::Stats, Arc::new(GenerationMap::new()))
    }

    async fn gated(
        rx: oneshot::Receiver<Result<u32, shardeck_api::Error>>,
    ) -> Result<u32, shardeck_api::Error> {
        rx.await.unwrap_or(Err(shardeck_api::Error::Http {
            status: 500,
            body: "gate dropped".into(),
        }))
    }

    /// Let every other branch run until it blocks.
    async fn settle_pending() {
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }

    #[tokio::test]
    async fn success_commits_value() {
        let exec = executor();
        let result = exec.execute(async { Ok(7) }).await;
        assert_eq!(result.ok(), Some(7));

        let state = exec.state();
        assert_eq!(state.status, RequestStatus::Success);
        assert_eq!(state.data, Some(7));
        assert_eq!(state.generation, 1);
        assert!(state.started_at.is_some());
    }

    #[tokio::test]
    async fn failure_is_classified_and_keeps_last_data() {
        let exec = executor();
        exec.execute(async { Ok(1) }).await.ok();
        let err = exec
            .execute(async { Err(shardeck_api::Error::Timeout { timeout_secs: 10 }) })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);

        let state = exec.state();
        assert_eq!(state.status, RequestStatus::Error);
        assert_eq!(state.error.map(|e| e.kind), Some(ErrorKind::Timeout));
        assert_eq!(state.data, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn latest_call_wins_when_older_settles_last() {
        let exec = executor();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let (tx3, rx3) = oneshot::channel();

        let (first, second, third, ()) = tokio::join!(
            exec.execute(gated(rx1)),
            exec.execute(gated(rx2)),
            exec.execute(gated(rx3)),
            async {
                settle_pending().await;
                tx3.send(Ok(3)).ok();
                settle_pending().await;
                tx2.send(Ok(2)).ok();
                tx1.send(Err(shardeck_api::Error::Timeout { timeout_secs: 1 })).ok();
            }
        );

        assert!(first.unwrap_err().is_aborted());
        assert!(second.unwrap_err().is_aborted());
        assert_eq!(third.ok(), Some(3));

        let state = exec.state();
        assert_eq!(state.status, RequestStatus::Success);
        assert_eq!(state.data, Some(3));
        assert!(state.error.is_none(), "superseded failure must not surface");
        assert_eq!(state.generation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn latest_call_wins_when_older_settles_first() {
        let exec = executor();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        let mut rx = exec.subscribe();

        let (first, second, ()) = tokio::join!(
            exec.execute(gated(rx1)),
            exec.execute(gated(rx2)),
            async {
                settle_pending().await;
                rx.borrow_and_update();
                tx1.send(Ok(1)).ok();
                settle_pending().await;
                assert!(
                    !rx.has_changed().unwrap_or(true),
                    "superseded success must not touch state"
                );
                tx2.send(Err(shardeck_api::Error::NotFound { path: "/x".into() })).ok();
            }
        );

        assert!(first.unwrap_err().is_aborted());
        assert_eq!(second.unwrap_err().kind, ErrorKind::NotFound);
        let state = exec.state();
        assert_eq!(state.status, RequestStatus::Error);
        assert_eq!(state.data, None);
    }

    #[tokio::test]
    async fn on_commit_runs_only_for_current_call() {
        let exec = executor();
        let ticket = exec.issue();
        exec.issue();

        let mut called = false;
        let result = exec.settle(ticket, Ok(5), |_| called = true);
        assert!(result.unwrap_err().is_aborted());
        assert!(!called);
    }

    #[tokio::test]
    async fn projection_stores_derived_data() {
        let exec = executor();
        let output = exec
            .execute_as(
                async { Ok("four".to_owned()) },
                |s| u32::try_from(s.len()).unwrap_or(0),
                |_| {},
            )
            .await;
        assert_eq!(output.ok().as_deref(), Some("four"));
        assert_eq!(exec.state().data, Some(4));
    }

    #[tokio::test]
    async fn reset_discards_in_flight_call() {
        let exec = executor();
        let ticket = exec.issue();
        exec.reset();

        assert!(exec.settle(ticket, Ok(9), |_| {}).unwrap_err().is_aborted());
        let state = exec.state();
        assert_eq!(state.status, RequestStatus::Idle);
        assert_eq!(state.data, None);
    }

    #[tokio::test]
    async fn ended_session_never_issues() {
        let exec = executor();
        let session = CancellationToken::new();
        session.cancel();

        let polled = std::sync::atomic::AtomicBool::new(false);
        let result = exec
            .execute_until(
                &session,
                async {
                    polled.store(true, std::sync::atomic::Ordering::SeqCst);
                    Ok(1)
                },
                |_| {},
            )
            .await;

        assert!(result.unwrap_err().is_aborted());
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(exec.state().status, RequestStatus::Idle);
        assert_eq!(exec.state().generation, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn session_ending_mid_flight_blocks_commit() {
        let exec = executor();
        let session = CancellationToken::new();
        let (tx, rx) = oneshot::channel();

        let mut committed = false;
        let (result, ()) = tokio::join!(
            exec.execute_until(&session, gated(rx), |_| committed = true),
            async {
                settle_pending().await;
                session.cancel();
                tx.send(Ok(5)).ok();
            }
        );

        assert!(result.unwrap_err().is_aborted());
        assert!(!committed);
        assert_eq!(exec.state().status, RequestStatus::Loading);
        assert_eq!(exec.state().data, None);
    }
}
