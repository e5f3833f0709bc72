// ── Service backend seam ──
//
// Object-safe view of the remote sharding service. `ShardClient` is the
// production implementation; tests drive the orchestration layer with a
// scripted in-process backend instead.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use shardeck_api::{
    CurrentStrategy, Error, HealthResponse, Metrics, NewUser, ShardClient, ShardsInfo, Strategy,
    StrategyChange, User, UserStats,
};

/// Every remote call the dashboard makes.
pub trait ShardBackend: Send + Sync + 'static {
    fn health(&self) -> BoxFuture<'_, Result<HealthResponse, Error>>;
    fn shards_info(&self) -> BoxFuture<'_, Result<ShardsInfo, Error>>;
    fn user_stats(&self) -> BoxFuture<'_, Result<UserStats, Error>>;
    fn metrics(&self) -> BoxFuture<'_, Result<Metrics, Error>>;
    fn current_strategy(&self) -> BoxFuture<'_, Result<CurrentStrategy, Error>>;
    fn set_strategy(&self, strategy: Strategy) -> BoxFuture<'_, Result<StrategyChange, Error>>;
    fn create_user(&self, user: NewUser) -> BoxFuture<'_, Result<User, Error>>;
    fn get_user(&self, id: i64) -> BoxFuture<'_, Result<User, Error>>;
    fn users_by_key(&self, shard_key: String) -> BoxFuture<'_, Result<Vec<User>, Error>>;
}

impl ShardBackend for ShardClient {
    fn health(&self) -> BoxFuture<'_, Result<HealthResponse, Error>> {
        ShardClient::health(self).boxed()
    }

    fn shards_info(&self) -> BoxFuture<'_, Result<ShardsInfo, Error>> {
        ShardClient::shards_info(self).boxed()
    }

    fn user_stats(&self) -> BoxFuture<'_, Result<UserStats, Error>> {
        ShardClient::user_stats(self).boxed()
    }

    fn metrics(&self) -> BoxFuture<'_, Result<Metrics, Error>> {
        ShardClient::metrics(self).boxed()
    }

    fn current_strategy(&self) -> BoxFuture<'_, Result<CurrentStrategy, Error>> {
        ShardClient::current_strategy(self).boxed()
    }

    fn set_strategy(&self, strategy: Strategy) -> BoxFuture<'_, Result<StrategyChange, Error>> {
        ShardClient::set_strategy(self, strategy).boxed()
    }

    fn create_user(&self, user: NewUser) -> BoxFuture<'_, Result<User, Error>> {
        async move { ShardClient::create_user(self, &user).await }.boxed()
    }

    fn get_user(&self, id: i64) -> BoxFuture<'_, Result<User, Error>> {
        ShardClient::get_user(self, id).boxed()
    }

    fn users_by_key(&self, shard_key: String) -> BoxFuture<'_, Result<Vec<User>, Error>> {
        async move { ShardClient::users_by_key(self, &shard_key).await }.boxed()
    }
}
