// ── Aggregate stats poller ──
//
// Fetches the shard overview and user statistics concurrently and joins
// them into one immutable snapshot. All-or-nothing: if either fetch fails
// no snapshot is produced.

mod schedule;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use shardeck_api::{ShardsInfo, UserStats};

use crate::backend::ShardBackend;

pub use schedule::PollingSchedule;

/// Last known aggregate view of the service. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub shard_stats: ShardsInfo,
    pub user_stats: UserStats,
    pub captured_at: DateTime<Utc>,
}

/// One row of [`StatsSnapshot::distribution`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardShare {
    pub shard: String,
    pub users: u64,
    /// Share of all users, 0.0 to 100.0.
    pub percent: f64,
}

impl StatsSnapshot {
    pub fn total_shards(&self) -> u32 {
        self.shard_stats.total_shards
    }

    /// Total users, preferring the dedicated user statistics.
    pub fn total_users(&self) -> u64 {
        self.user_stats.total_users
    }

    /// Active strategy as reported by the shard overview.
    pub fn strategy(&self) -> &str {
        &self.shard_stats.current_strategy
    }

    /// Per-shard user counts with their share of the total.
    ///
    /// Every shard from the overview appears, even with no users; shares
    /// are 0 when the total is 0.
    pub fn distribution(&self) -> Vec<ShardShare> {
        let total = self.total_users();
        let mut rows: Vec<ShardShare> = self
            .shard_stats
            .shards
            .iter()
            .map(|(name, stats)| {
                let users = self
                    .user_stats
                    .users_per_shard
                    .get(name)
                    .copied()
                    .unwrap_or(stats.user_count);
                ShardShare {
                    shard: name.clone(),
                    users,
                    percent: percent_of(users, total),
                }
            })
            .collect();

        for (name, &users) in &self.user_stats.users_per_shard {
            if !self.shard_stats.shards.contains_key(name) {
                rows.push(ShardShare {
                    shard: name.clone(),
                    users,
                    percent: percent_of(users, total),
                });
            }
        }
        rows.sort_by(|a, b| a.shard.cmp(&b.shard));
        rows
    }
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn percent_of(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Fetch both datasets concurrently and join them.
///
/// Both fetches always run to completion; the shard overview's error is
/// reported when both fail, so the outcome does not depend on timing.
pub async fn fetch_snapshot(
    backend: &dyn ShardBackend,
) -> Result<StatsSnapshot, shardeck_api::Error> {
    let (shards, users) = tokio::join!(backend.shards_info(), backend.user_stats());
    let shard_stats = shards?;
    let user_stats = users?;

    let snapshot = StatsSnapshot {
        shard_stats,
        user_stats,
        captured_at: Utc::now(),
    };
    debug!(
        total_shards = snapshot.total_shards(),
        total_users = snapshot.total_users(),
        "stats snapshot assembled"
    );
    Ok(snapshot)
}
