// ── Scripted in-process backend for orchestration tests ──

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::oneshot;
use tokio::time::Instant;

use shardeck_api::{
    CurrentStrategy, Error, HealthResponse, Metrics, NewUser, ShardStats, ShardsInfo, Strategy,
    StrategyChange, StrategyPerformance, User, UserStats,
};

use crate::backend::ShardBackend;

type Fallback<T> = Arc<dyn Fn() -> Result<T, Error> + Send + Sync>;

enum Step<T> {
    Reply(Result<T, Error>),
    Gated(oneshot::Receiver<Result<T, Error>>),
}

/// Per-endpoint response script: queued steps first, then the fallback.
pub(crate) struct Script<T> {
    steps: Mutex<VecDeque<Step<T>>>,
    fallback: Mutex<Option<Fallback<T>>>,
}

impl<T: Send + 'static> Script<T> {
    fn new() -> Self {
        Self {
            steps: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(None),
        }
    }

    pub(crate) fn push(&self, reply: Result<T, Error>) {
        self.steps.lock().unwrap().push_back(Step::Reply(reply));
    }

    /// Queue a call that settles only when the returned sender fires.
    pub(crate) fn gate(&self) -> oneshot::Sender<Result<T, Error>> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().unwrap().push_back(Step::Gated(rx));
        tx
    }

    /// Answer every unscripted call with `f()`.
    pub(crate) fn always(&self, f: impl Fn() -> Result<T, Error> + Send + Sync + 'static) {
        *self.fallback.lock().unwrap() = Some(Arc::new(f));
    }

    fn next(&self) -> BoxFuture<'_, Result<T, Error>> {
        let step = self.steps.lock().unwrap().pop_front();
        let fallback = self.fallback.lock().unwrap().clone();
        async move {
            match step {
                Some(Step::Reply(reply)) => reply,
                Some(Step::Gated(rx)) => rx.await.unwrap_or_else(|_| Err(unknown("gate dropped"))),
                None => fallback.map_or_else(|| Err(unknown("unscripted call")), |f| f()),
            }
        }
        .boxed()
    }
}

/// Fake service. Every call is recorded with its virtual timestamp.
pub(crate) struct FakeBackend {
    pub health: Script<HealthResponse>,
    pub shards: Script<ShardsInfo>,
    pub users: Script<UserStats>,
    pub metrics: Script<Metrics>,
    pub current_strategy: Script<CurrentStrategy>,
    pub set_strategy: Script<StrategyChange>,
    pub user: Script<User>,
    pub users_by_key: Script<Vec<User>>,
    calls: Mutex<Vec<(&'static str, Instant)>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            health: Script::new(),
            shards: Script::new(),
            users: Script::new(),
            metrics: Script::new(),
            current_strategy: Script::new(),
            set_strategy: Script::new(),
            user: Script::new(),
            users_by_key: Script::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// A backend whose every endpoint answers successfully.
    pub(crate) fn healthy() -> Arc<Self> {
        let backend = Self::new();
        backend.health.always(|| Ok(healthy()));
        backend.shards.always(|| Ok(shards_info(4, "hash")));
        backend.users.always(|| Ok(user_stats(120)));
        backend.metrics.always(|| Ok(metrics()));
        backend
    }

    pub(crate) fn count(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == endpoint)
            .count()
    }

    pub(crate) fn times(&self, endpoint: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == endpoint)
            .map(|(_, at)| *at)
            .collect()
    }

    fn record(&self, endpoint: &'static str) {
        self.calls.lock().unwrap().push((endpoint, Instant::now()));
    }
}

impl ShardBackend for FakeBackend {
    fn health(&self) -> BoxFuture<'_, Result<HealthResponse, Error>> {
        self.record("health");
        self.health.next()
    }

    fn shards_info(&self) -> BoxFuture<'_, Result<ShardsInfo, Error>> {
        self.record("shards_info");
        self.shards.next()
    }

    fn user_stats(&self) -> BoxFuture<'_, Result<UserStats, Error>> {
        self.record("user_stats");
        self.users.next()
    }

    fn metrics(&self) -> BoxFuture<'_, Result<Metrics, Error>> {
        self.record("metrics");
        self.metrics.next()
    }

    fn current_strategy(&self) -> BoxFuture<'_, Result<CurrentStrategy, Error>> {
        self.record("current_strategy");
        self.current_strategy.next()
    }

    fn set_strategy(&self, _strategy: Strategy) -> BoxFuture<'_, Result<StrategyChange, Error>> {
        self.record("set_strategy");
        self.set_strategy.next()
    }

    fn create_user(&self, _user: NewUser) -> BoxFuture<'_, Result<User, Error>> {
        self.record("create_user");
        self.user.next()
    }

    fn get_user(&self, _id: i64) -> BoxFuture<'_, Result<User, Error>> {
        self.record("get_user");
        self.user.next()
    }

    fn users_by_key(&self, _shard_key: String) -> BoxFuture<'_, Result<Vec<User>, Error>> {
        self.record("users_by_key");
        self.users_by_key.next()
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub(crate) fn unknown(body: &str) -> Error {
    Error::Http {
        status: 500,
        body: body.into(),
    }
}

pub(crate) fn unreachable() -> Error {
    Error::Connect {
        url: "http://localhost:8000/api/v1/health".into(),
        reason: "connection refused".into(),
    }
}

pub(crate) fn healthy() -> HealthResponse {
    HealthResponse {
        status: "healthy".into(),
        extra: serde_json::Map::new(),
    }
}

pub(crate) fn shards_info(total_shards: u32, strategy: &str) -> ShardsInfo {
    let shards = (1..=total_shards)
        .map(|i| {
            let stats = ShardStats {
                user_count: 30,
                db_size_mb: 8.0,
                db_size_bytes: None,
                extra: serde_json::Map::new(),
            };
            (format!("shard{i}"), stats)
        })
        .collect();
    ShardsInfo {
        shards,
        total_shards,
        current_strategy: strategy.into(),
        total_users: None,
    }
}

pub(crate) fn user_stats(total_users: u64) -> UserStats {
    let per_shard = total_users / 4;
    UserStats {
        total_users,
        users_per_shard: (1..=4).map(|i| (format!("shard{i}"), per_shard)).collect(),
        strategy: "hash".into(),
    }
}

pub(crate) fn metrics() -> Metrics {
    let mut performance_metrics = BTreeMap::new();
    performance_metrics.insert(
        "hash".to_owned(),
        StrategyPerformance {
            total_operations: 12,
            average_time_ms: 3.5,
            total_time_seconds: 0.042,
        },
    );
    Metrics {
        shard_statistics: BTreeMap::new(),
        performance_metrics,
        current_strategy: "hash".into(),
        response_times: None,
    }
}

pub(crate) fn strategy_change(strategy: Strategy) -> StrategyChange {
    StrategyChange {
        message: format!("Strategy changed to {strategy}"),
        current_strategy: strategy.as_str().to_owned(),
    }
}

pub(crate) fn user(id: i64, shard_key: &str) -> User {
    User {
        id,
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        full_name: None,
        shard_key: shard_key.into(),
        created_at: chrono::Utc::now(),
        updated_at: None,
        shard_name: "shard1".into(),
    }
}
