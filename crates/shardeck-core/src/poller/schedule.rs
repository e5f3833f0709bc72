// ── Recurring refresh timer ──
//
// Owns at most one timer task. Starting replaces any running timer, so two
// never run concurrently. Each tick spawns its work as a separate task:
// a slow refresh never delays the next tick, and overlapping refreshes
// are settled by their executor's generation rule.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Start/stop handle for one recurring job.
pub struct PollingSchedule {
    name: &'static str,
    interval: Duration,
    running: Mutex<Option<Running>>,
    starts: AtomicU64,
}

impl std::fmt::Debug for PollingSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSchedule")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl PollingSchedule {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            running: Mutex::new(None),
            starts: AtomicU64::new(0),
        }
    }

    /// Whether a timer is currently installed and running.
    pub fn is_active(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// How many timers this schedule has created so far.
    pub fn starts(&self) -> u64 {
        self.starts.load(Ordering::Relaxed)
    }

    /// Install a fresh timer that calls `tick` every interval, replacing
    /// any running one. The first call happens one interval from now.
    pub fn start<F, Fut>(&self, tick: F) -> bool
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.start_if(|| true, tick)
    }

    /// Like [`start`](Self::start), but only if `guard` still holds.
    ///
    /// `guard` is evaluated under the schedule's lock, so a concurrent
    /// [`stop`](Self::stop) either runs entirely before it (and the guard
    /// can observe that) or entirely after the new timer is installed.
    /// A zero interval never installs a timer.
    pub fn start_if<G, F, Fut>(&self, guard: G, tick: F) -> bool
    where
        G: FnOnce() -> bool,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.interval.is_zero() {
            debug!(schedule = self.name, "zero interval, schedule disabled");
            return false;
        }

        let mut running = self.lock();
        if !guard() {
            return false;
        }
        if let Some(old) = running.take() {
            old.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(timer_task(self.name, self.interval, cancel.clone(), tick));
        *running = Some(Running { cancel, handle });
        self.starts.fetch_add(1, Ordering::Relaxed);
        debug!(schedule = self.name, interval = ?self.interval, "schedule started");
        true
    }

    /// Remove the timer. Returns whether one was installed. Idempotent.
    ///
    /// Work already spawned by earlier ticks is left to finish.
    pub fn stop(&self) -> bool {
        let Some(running) = self.lock().take() else {
            return false;
        };
        running.cancel.cancel();
        debug!(schedule = self.name, "schedule stopped");
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PollingSchedule {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn timer_task<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    tick: F,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                debug!(schedule = name, "schedule tick");
                tokio::spawn(tick());
            }
        }
    }
}
