// ── Retrying health probe ──
//
// Bounded, constant-delay retry of the health endpoint. The retry
// decision is a pure state machine; the runner only performs attempts and
// waits. The wait goes through an injectable `Sleeper` so tests can run on
// paused or fake time.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{info, warn};

use shardeck_api::HealthResponse;

use crate::backend::ShardBackend;
use crate::config::ProbePolicy;
use crate::error::ErrorInfo;
use crate::request::{GenerationMap, RequestExecutor, Slot, Ticket};

// ── State machine ───────────────────────────────────────────────────

/// Progress of one probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    /// An attempt is due; `remaining` counts it and every later one.
    Attempting { remaining: u32 },
    Succeeded,
    Failed,
}

/// Outcome of a single health attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEvent {
    AttemptSucceeded,
    AttemptFailed,
}

impl ProbeState {
    pub fn start(policy: ProbePolicy) -> Self {
        Self::Attempting {
            remaining: policy.max_attempts.max(1),
        }
    }

    /// Pure transition function. Terminal states absorb every event.
    #[must_use]
    pub fn next(self, event: ProbeEvent) -> Self {
        match (self, event) {
            (Self::Attempting { .. }, ProbeEvent::AttemptSucceeded) => Self::Succeeded,
            (Self::Attempting { remaining }, ProbeEvent::AttemptFailed) if remaining > 1 => {
                Self::Attempting {
                    remaining: remaining - 1,
                }
            }
            (Self::Attempting { .. }, ProbeEvent::AttemptFailed) => Self::Failed,
            (terminal, _) => terminal,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Attempting { .. })
    }
}

// ── Delay mechanism ─────────────────────────────────────────────────

/// Source of the fixed delay between attempts.
pub trait Sleeper: Send + Sync + 'static {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Real timer, backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

// ── Runner ──────────────────────────────────────────────────────────

/// Final answer of a probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeVerdict {
    Healthy,
    /// Every attempt failed; carries the last attempt's error.
    Unhealthy(ErrorInfo),
    /// A newer run (or teardown) took over before this one finished.
    Superseded,
}

/// Health probe bound to one dashboard's generation map.
///
/// Each run is identified by a ticket on the probe's run slot; individual
/// attempts go through an executor on its attempt slot. Probes on disjoint
/// slots never supersede each other.
pub struct HealthProbe {
    run_slot: Slot,
    attempts: RequestExecutor<HealthResponse>,
    generations: Arc<GenerationMap>,
    sleeper: Arc<dyn Sleeper>,
    policy: ProbePolicy,
}

impl std::fmt::Debug for HealthProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthProbe")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl HealthProbe {
    /// The status-owning probe: runs on [`Slot::Connection`], attempts on
    /// [`Slot::Health`].
    pub fn new(
        generations: Arc<GenerationMap>,
        sleeper: Arc<dyn Sleeper>,
        policy: ProbePolicy,
    ) -> Self {
        Self::on_slots(Slot::Connection, Slot::Health, generations, sleeper, policy)
    }

    /// A read-only probe on [`Slot::Check`] / [`Slot::CheckAttempt`], which
    /// never takes commit rights from a connection run.
    pub fn standalone(
        generations: Arc<GenerationMap>,
        sleeper: Arc<dyn Sleeper>,
        policy: ProbePolicy,
    ) -> Self {
        Self::on_slots(Slot::Check, Slot::CheckAttempt, generations, sleeper, policy)
    }

    fn on_slots(
        run_slot: Slot,
        attempt_slot: Slot,
        generations: Arc<GenerationMap>,
        sleeper: Arc<dyn Sleeper>,
        policy: ProbePolicy,
    ) -> Self {
        Self {
            run_slot,
            attempts: RequestExecutor::new(attempt_slot, Arc::clone(&generations)),
            generations,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> ProbePolicy {
        self.policy
    }

    /// Forget the last attempt and invalidate one still in flight.
    pub fn reset(&self) {
        self.attempts.reset();
    }

    /// Claim the run slot for a new run, superseding any older run.
    pub fn begin(&self) -> Ticket {
        self.generations.issue(self.run_slot)
    }

    /// Drive the run identified by `run` to a verdict.
    pub async fn run(&self, run: Ticket, backend: &dyn ShardBackend) -> ProbeVerdict {
        let mut state = ProbeState::start(self.policy);
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let outcome = self.attempts.execute(backend.health()).await;
            if !self.generations.is_current(&run) {
                return ProbeVerdict::Superseded;
            }

            let err = match outcome {
                Ok(_) => {
                    info!(attempt, "health check succeeded");
                    return ProbeVerdict::Healthy;
                }
                Err(err) if err.is_aborted() => return ProbeVerdict::Superseded,
                Err(err) => err,
            };

            state = state.next(ProbeEvent::AttemptFailed);
            match state {
                ProbeState::Attempting { remaining } => {
                    warn!(
                        attempt,
                        error = %err.raw,
                        "Retrying health check... ({remaining} attempts left)"
                    );
                    self.sleeper.sleep(self.policy.delay).await;
                    if !self.generations.is_current(&run) {
                        return ProbeVerdict::Superseded;
                    }
                }
                ProbeState::Failed | ProbeState::Succeeded => {
                    info!(attempts = attempt, error = %err.raw, "health check failed");
                    return ProbeVerdict::Unhealthy(err);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ErrorKind;
    use crate::test_support::{FakeBackend, healthy, unreachable};

    fn policy(max_attempts: u32, delay_ms: u64) -> ProbePolicy {
        ProbePolicy::new(max_attempts, Duration::from_millis(delay_ms))
    }

    fn probe(policy: ProbePolicy) -> HealthProbe {
        HealthProbe::new(
            Arc::new(GenerationMap::new()),
            Arc::new(TokioSleeper),
            policy,
        )
    }

    /// Records requested delays and returns immediately.
    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
            self.delays.lock().unwrap().push(duration);
            futures_util::future::ready(()).boxed()
        }
    }

    // ── Pure transitions ──

    #[test]
    fn success_is_terminal_immediately() {
        let state = ProbeState::start(policy(3, 0));
        assert_eq!(state, ProbeState::Attempting { remaining: 3 });
        assert_eq!(state.next(ProbeEvent::AttemptSucceeded), ProbeState::Succeeded);
    }

    #[test]
    fn failures_count_down_to_failed() {
        let mut state = ProbeState::start(policy(3, 0));
        let mut seen = vec![state];
        while !state.is_terminal() {
            state = state.next(ProbeEvent::AttemptFailed);
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                ProbeState::Attempting { remaining: 3 },
                ProbeState::Attempting { remaining: 2 },
                ProbeState::Attempting { remaining: 1 },
                ProbeState::Failed,
            ]
        );
    }

    #[test]
    fn terminal_states_absorb_events() {
        assert_eq!(
            ProbeState::Failed.next(ProbeEvent::AttemptSucceeded),
            ProbeState::Failed
        );
        assert_eq!(
            ProbeState::Succeeded.next(ProbeEvent::AttemptFailed),
            ProbeState::Succeeded
        );
    }

    // ── Runner ──

    #[tokio::test(start_paused = true)]
    async fn always_failing_makes_exactly_three_spaced_attempts() {
        let backend = FakeBackend::new();
        backend.health.always(|| Err(unreachable()));
        let probe = probe(policy(3, 2000));

        let run = probe.begin();
        let verdict = probe.run(run, backend.as_ref()).await;

        let ProbeVerdict::Unhealthy(err) = verdict else {
            panic!("expected Unhealthy, got {verdict:?}");
        };
        assert_eq!(err.kind, ErrorKind::NetworkUnreachable);

        let times = backend.times("health");
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(2000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_second_attempt_stops_retrying() {
        let backend = FakeBackend::new();
        backend.health.push(Err(unreachable()));
        backend.health.push(Ok(healthy()));
        backend.health.always(|| Err(unreachable()));
        let probe = probe(policy(3, 2000));

        let run = probe.begin();
        assert_eq!(probe.run(run, backend.as_ref()).await, ProbeVerdict::Healthy);
        assert_eq!(backend.count("health"), 2);
    }

    #[tokio::test]
    async fn delay_is_constant_and_injected() {
        let backend = FakeBackend::new();
        backend.health.always(|| Err(unreachable()));
        let sleeper = Arc::new(RecordingSleeper::default());
        let probe = HealthProbe::new(
            Arc::new(GenerationMap::new()),
            sleeper.clone(),
            policy(4, 750),
        );

        let run = probe.begin();
        probe.run(run, backend.as_ref()).await;

        assert_eq!(backend.count("health"), 4);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_millis(750); 3]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn newer_run_supersedes_older_during_backoff() {
        let backend = FakeBackend::new();
        backend.health.push(Err(unreachable()));
        backend.health.always(|| Ok(healthy()));
        let probe = probe(policy(3, 2000));

        let first = probe.begin();
        let (old, new) = tokio::join!(probe.run(first, backend.as_ref()), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let second = probe.begin();
            probe.run(second, backend.as_ref()).await
        });

        assert_eq!(old, ProbeVerdict::Superseded);
        assert_eq!(new, ProbeVerdict::Healthy);
        assert_eq!(backend.count("health"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn standalone_probe_leaves_connection_run_current() {
        let backend = FakeBackend::new();
        let slow = backend.health.gate();
        backend.health.always(|| Ok(healthy()));
        let generations = Arc::new(GenerationMap::new());
        let sleeper = Arc::new(TokioSleeper);
        let owner = HealthProbe::new(Arc::clone(&generations), sleeper.clone(), policy(3, 0));
        let check = HealthProbe::standalone(Arc::clone(&generations), sleeper, policy(3, 0));

        let run = owner.begin();
        let (owned, checked) = tokio::join!(owner.run(run, backend.as_ref()), async {
            tokio::time::sleep(Duration::from_millis(1)).await;
            let verdict = check.run(check.begin(), backend.as_ref()).await;
            slow.send(Ok(healthy())).ok();
            verdict
        });

        assert_eq!(checked, ProbeVerdict::Healthy);
        assert_eq!(owned, ProbeVerdict::Healthy);
        assert!(generations.is_current(&run));
    }
}
