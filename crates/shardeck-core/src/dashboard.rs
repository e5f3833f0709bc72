// ── Dashboard facade ──
//
// Owns the store, the probe, every request slot and both schedules, and
// exposes the action surface consumers call. The probe decides status; the
// stats executor decides the snapshot; everything else only ever reaches
// the store's error field.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use shardeck_api::{
    Metrics, NewUser, ShardClient, Strategy, StrategyChange, TransportConfig, User,
};

use crate::backend::ShardBackend;
use crate::config::DashboardConfig;
use crate::error::{CoreError, ErrorInfo};
use crate::poller::{PollingSchedule, StatsSnapshot, fetch_snapshot};
use crate::probe::{HealthProbe, ProbeVerdict, Sleeper, TokioSleeper};
use crate::request::{GenerationMap, RequestExecutor, RequestState, Slot, Ticket};
use crate::store::{DashboardState, DashboardStore, SystemStatus};

/// Result of [`Dashboard::set_strategy`].
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyUpdate {
    /// The latest snapshot already showed this strategy; nothing was sent.
    Unchanged(Strategy),
    Changed(StrategyChange),
}

// ── Dashboard ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<DashboardInner>`. Call [`init`](Self::init)
/// once to probe the service and start polling, and
/// [`teardown`](Self::teardown) to stop everything. Late results that
/// arrive after teardown are discarded.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    backend: Arc<dyn ShardBackend>,
    store: DashboardStore,
    probe: HealthProbe,
    /// Read-only probe behind [`Dashboard::probe`].
    check: HealthProbe,
    /// Cancelled by teardown; refresh and metrics calls issued under it
    /// can neither start nor commit afterwards.
    session: Mutex<CancellationToken>,
    stats: RequestExecutor<Arc<StatsSnapshot>>,
    metrics: RequestExecutor<Metrics>,
    /// Name of the active strategy as last reported by the service.
    strategy: RequestExecutor<String>,
    /// Records returned by the most recent user call.
    users: RequestExecutor<Vec<User>>,
    stats_schedule: PollingSchedule,
    metrics_schedule: PollingSchedule,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .field("stats_schedule", &self.inner.stats_schedule)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dashboard`]; every knob has a default.
pub struct DashboardBuilder {
    backend: Arc<dyn ShardBackend>,
    config: DashboardConfig,
    sleeper: Arc<dyn Sleeper>,
    generations: Option<Arc<GenerationMap>>,
}

impl DashboardBuilder {
    pub fn config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the delay mechanism used between probe attempts.
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Use an existing generation map instead of a fresh one.
    pub fn generations(mut self, generations: Arc<GenerationMap>) -> Self {
        self.generations = Some(generations);
        self
    }

    pub fn build(self) -> Dashboard {
        let generations = self.generations.unwrap_or_default();
        let inner = DashboardInner {
            probe: HealthProbe::new(
                Arc::clone(&generations),
                Arc::clone(&self.sleeper),
                self.config.probe,
            ),
            check: HealthProbe::standalone(
                Arc::clone(&generations),
                self.sleeper,
                self.config.probe,
            ),
            session: Mutex::new(CancellationToken::new()),
            stats: RequestExecutor::new(Slot::Stats, Arc::clone(&generations)),
            metrics: RequestExecutor::new(Slot::Metrics, Arc::clone(&generations)),
            strategy: RequestExecutor::new(Slot::Strategy, Arc::clone(&generations)),
            users: RequestExecutor::new(Slot::Users, Arc::clone(&generations)),
            stats_schedule: PollingSchedule::new("stats", self.config.poll_interval),
            metrics_schedule: PollingSchedule::new("metrics", self.config.metrics_interval),
            store: DashboardStore::new(generations),
            backend: self.backend,
            config: self.config,
        };
        Dashboard {
            inner: Arc::new(inner),
        }
    }
}

impl Dashboard {
    /// Create a dashboard over `backend`. Does NOT probe; call
    /// [`init`](Self::init).
    pub fn new(backend: Arc<dyn ShardBackend>, config: DashboardConfig) -> Self {
        Self::builder(backend).config(config).build()
    }

    pub fn builder(backend: Arc<dyn ShardBackend>) -> DashboardBuilder {
        DashboardBuilder {
            backend,
            config: DashboardConfig::default(),
            sleeper: Arc::new(TokioSleeper),
            generations: None,
        }
    }

    /// Dashboard over a real HTTP client built from `transport`.
    pub fn from_config(
        transport: &TransportConfig,
        config: DashboardConfig,
    ) -> Result<Self, CoreError> {
        let client = ShardClient::new(transport)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn state(&self) -> DashboardState {
        self.inner.store.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.inner.store.subscribe()
    }

    /// Whether the stats refresh timer is running.
    pub fn is_polling(&self) -> bool {
        self.inner.stats_schedule.is_active()
    }

    pub fn stats_schedule(&self) -> &PollingSchedule {
        &self.inner.stats_schedule
    }

    pub fn metrics_schedule(&self) -> &PollingSchedule {
        &self.inner.metrics_schedule
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// First activation: probe the service, then fetch and start polling
    /// if it is healthy. Returns the resulting status.
    pub async fn init(&self) -> Result<SystemStatus, CoreError> {
        info!(
            poll_interval = ?self.inner.config.poll_interval,
            attempts = self.inner.config.probe.max_attempts,
            "initializing dashboard"
        );
        self.connect().await
    }

    /// Manual retry: back to `Checking`, probe again, and on success fetch
    /// immediately and restart polling. Supersedes a probe run in flight.
    pub async fn retry_connection(&self) -> Result<SystemStatus, CoreError> {
        info!("retrying connection");
        self.connect().await
    }

    async fn connect(&self) -> Result<SystemStatus, CoreError> {
        let inner = &self.inner;
        let run = inner.probe.begin();

        inner.stats_schedule.stop();
        inner.stats.reset();
        inner.store.enter_checking(&run)?;

        let verdict = inner.probe.run(run, inner.backend.as_ref()).await;
        if !inner.store.settle_probe(&run, &verdict)? {
            debug!(generation = run.generation, "probe run superseded");
            return Ok(inner.store.status());
        }

        if verdict == ProbeVerdict::Healthy {
            if let Err(err) = self.refresh_data().await {
                if !err.is_aborted() {
                    warn!(error = %err, "initial stats fetch failed");
                }
            }
            self.start_polling(&run);
        }
        Ok(inner.store.status())
    }

    /// Install the stats timer, unless `run` was superseded or the system
    /// left `Healthy` in the meantime.
    fn start_polling(&self, run: &Ticket) {
        let inner = &self.inner;
        let still_healthy = || {
            inner.store.generations().is_current(run)
                && inner.store.status() == SystemStatus::Healthy
        };
        if !inner.stats_schedule.start_if(still_healthy, self.stats_tick()) {
            debug!("stats polling not started");
        }
    }

    /// One scheduled stats refresh, bound to the session current now.
    fn stats_tick(&self) -> impl Fn() -> BoxedTick + Send + Sync + 'static {
        let weak = Arc::downgrade(&self.inner);
        let session = self.inner.session();
        move || {
            let session = session.clone();
            scheduled(weak.clone(), |dashboard| async move {
                if let Err(err) = dashboard.refresh_in(&session).await {
                    if !err.is_aborted() {
                        warn!(error = %err, "scheduled stats refresh failed");
                    }
                }
            })
        }
    }

    /// One scheduled metrics fetch, bound to the session current now.
    fn metrics_tick(&self) -> impl Fn() -> BoxedTick + Send + Sync + 'static {
        let weak = Arc::downgrade(&self.inner);
        let session = self.inner.session();
        move || {
            let session = session.clone();
            scheduled(weak.clone(), |dashboard| async move {
                if let Err(err) = dashboard.metrics_in(&session).await {
                    if !err.is_aborted() {
                        warn!(error = %err, "metrics refresh failed");
                    }
                }
            })
        }
    }

    /// End of life: stop both timers and make every call still in flight
    /// unable to commit. The store keeps its last state.
    pub fn teardown(&self) {
        let inner = &self.inner;
        inner.end_session();
        inner.probe.reset();
        inner.check.reset();
        inner.stats.reset();
        inner.metrics.reset();
        inner.strategy.reset();
        inner.users.reset();
        inner.store.retire();
        inner.stats_schedule.stop();
        inner.metrics_schedule.stop();
        debug!("dashboard torn down");
    }

    // ── Actions ──────────────────────────────────────────────────────

    /// Fetch a fresh snapshot out of band.
    ///
    /// All-or-nothing: on success the snapshot is replaced and
    /// `last_update` advances; on failure the previous snapshot stays and
    /// the error is surfaced. Allowed in any status.
    pub async fn refresh_data(&self) -> Result<Arc<StatsSnapshot>, ErrorInfo> {
        let session = self.inner.session();
        self.refresh_in(&session).await
    }

    async fn refresh_in(
        &self,
        session: &CancellationToken,
    ) -> Result<Arc<StatsSnapshot>, ErrorInfo> {
        let inner = &self.inner;
        let store = &inner.store;
        let op = async { fetch_snapshot(inner.backend.as_ref()).await.map(Arc::new) };
        let snapshot = inner
            .stats
            .execute_until(session, op, |outcome| match outcome {
                Ok(snapshot) => store.publish_snapshot(Arc::clone(snapshot)),
                Err(err) => store.set_error(err),
            })
            .await?;
        debug!(
            total_shards = snapshot.total_shards(),
            total_users = snapshot.total_users(),
            "snapshot published"
        );
        Ok(snapshot)
    }

    /// Clear the current error. A no-op when there is none.
    pub fn clear_error(&self) -> bool {
        self.inner.store.clear_error()
    }

    /// Run the probe alone, without touching status or polling.
    ///
    /// Runs on its own slots, so a connect in flight keeps its commit
    /// rights. A newer standalone probe or teardown supersedes it.
    pub async fn probe(&self) -> ProbeVerdict {
        let check = &self.inner.check;
        check.run(check.begin(), self.inner.backend.as_ref()).await
    }

    // ── Strategy ─────────────────────────────────────────────────────

    pub async fn current_strategy(&self) -> Result<String, ErrorInfo> {
        let inner = &self.inner;
        inner
            .strategy
            .execute_as(
                inner.backend.current_strategy(),
                |current| current.current_strategy.clone(),
                surface_error(&inner.store),
            )
            .await
            .map(|current| current.current_strategy)
    }

    /// Switch the active strategy.
    ///
    /// Skips the request when the latest snapshot already shows
    /// `strategy`. After a change the snapshot is refreshed if healthy.
    pub async fn set_strategy(&self, strategy: Strategy) -> Result<StrategyUpdate, ErrorInfo> {
        let inner = &self.inner;
        let active = inner
            .store
            .snapshot()
            .is_some_and(|s| s.strategy().eq_ignore_ascii_case(strategy.as_str()));
        if active {
            debug!(%strategy, "strategy already active");
            return Ok(StrategyUpdate::Unchanged(strategy));
        }

        let change = inner
            .strategy
            .execute_as(
                inner.backend.set_strategy(strategy),
                |change| change.current_strategy.clone(),
                surface_error(&inner.store),
            )
            .await?;
        info!(strategy = %change.current_strategy, "strategy changed");

        if inner.store.status() == SystemStatus::Healthy {
            if let Err(err) = self.refresh_data().await {
                debug!(error = %err, "refresh after strategy change failed");
            }
        }
        Ok(StrategyUpdate::Changed(change))
    }

    // ── Users ────────────────────────────────────────────────────────

    pub async fn create_user(&self, user: NewUser) -> Result<User, ErrorInfo> {
        let inner = &self.inner;
        inner
            .users
            .execute_as(
                inner.backend.create_user(user),
                |created| vec![created.clone()],
                surface_error(&inner.store),
            )
            .await
    }

    pub async fn user(&self, id: i64) -> Result<User, ErrorInfo> {
        let inner = &self.inner;
        inner
            .users
            .execute_as(
                inner.backend.get_user(id),
                |found| vec![found.clone()],
                surface_error(&inner.store),
            )
            .await
    }

    pub async fn users_by_key(&self, shard_key: &str) -> Result<Vec<User>, ErrorInfo> {
        let inner = &self.inner;
        inner
            .users
            .execute_then(
                inner.backend.users_by_key(shard_key.to_owned()),
                surface_error(&inner.store),
            )
            .await
    }

    pub fn users_state(&self) -> RequestState<Vec<User>> {
        self.inner.users.state()
    }

    // ── Monitoring ───────────────────────────────────────────────────

    pub async fn metrics(&self) -> Result<Metrics, ErrorInfo> {
        let session = self.inner.session();
        self.metrics_in(&session).await
    }

    async fn metrics_in(&self, session: &CancellationToken) -> Result<Metrics, ErrorInfo> {
        let inner = &self.inner;
        let op = async { inner.backend.metrics().await };
        inner
            .metrics
            .execute_until(session, op, surface_error(&inner.store))
            .await
    }

    pub fn subscribe_metrics(&self) -> watch::Receiver<RequestState<Metrics>> {
        self.inner.metrics.subscribe()
    }

    /// Fetch metrics now and then every `metrics_interval`, independent of
    /// the stats schedule. Restarting replaces the running monitor.
    pub fn start_metrics_monitor(&self) -> bool {
        let tick = self.metrics_tick();
        let first = tick();
        if !self.inner.metrics_schedule.start(tick) {
            return false;
        }
        tokio::spawn(first);
        true
    }

    pub fn stop_metrics_monitor(&self) -> bool {
        self.inner.metrics_schedule.stop()
    }
}

impl DashboardInner {
    fn session(&self) -> CancellationToken {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel the current session and open a fresh one for a later `init`.
    fn end_session(&self) {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        session.cancel();
        *session = CancellationToken::new();
    }
}

type BoxedTick = futures_util::future::BoxFuture<'static, ()>;

/// Upgrade `weak` and run `job`; a dropped dashboard makes it a no-op.
fn scheduled<J, Fut>(weak: Weak<DashboardInner>, job: J) -> BoxedTick
where
    J: FnOnce(Dashboard) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::pin(async move {
        if let Some(inner) = weak.upgrade() {
            job(Dashboard { inner }).await;
        }
    })
}

/// Commit hook that surfaces a failure in the store's error field.
fn surface_error<O>(store: &DashboardStore) -> impl FnOnce(&Result<O, ErrorInfo>) + '_ {
    move |outcome| {
        if let Err(err) = outcome {
            store.set_error(err);
        }
    }
}
