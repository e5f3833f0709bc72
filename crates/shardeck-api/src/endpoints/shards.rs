// Shard and user statistics endpoints.

use tracing::debug;

use crate::client::ShardClient;
use crate::error::Error;
use crate::models::{ShardsInfo, UserStats};

impl ShardClient {
    /// Per-shard statistics plus the active strategy.
    ///
    /// `GET /shards/info`
    pub async fn shards_info(&self) -> Result<ShardsInfo, Error> {
        let url = self.url(&["shards", "info"])?;
        debug!("fetching shard info");
        self.get(url).await
    }

    /// Aggregate user counts per shard.
    ///
    /// `GET /stats/users`
    pub async fn user_stats(&self) -> Result<UserStats, Error> {
        let url = self.url(&["stats", "users"])?;
        debug!("fetching user stats");
        self.get(url).await
    }
}
