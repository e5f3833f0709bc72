// Performance monitoring endpoint.

use tracing::debug;

use crate::client::ShardClient;
use crate::error::Error;
use crate::models::Metrics;

impl ShardClient {
    /// Shard statistics and per-strategy timings.
    ///
    /// `GET /monitoring/metrics`
    pub async fn metrics(&self) -> Result<Metrics, Error> {
        let url = self.url(&["monitoring", "metrics"])?;
        debug!("fetching performance metrics");
        self.get(url).await
    }
}
