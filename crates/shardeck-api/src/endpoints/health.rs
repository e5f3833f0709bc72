// Liveness endpoint.

use tracing::debug;

use crate::client::ShardClient;
use crate::error::Error;
use crate::models::HealthResponse;

impl ShardClient {
    /// Probe service liveness.
    ///
    /// `GET /health`
    ///
    /// A body other than `{"status": "healthy"}` is reported as
    /// [`Error::Unhealthy`] even when the HTTP status is 200.
    pub async fn health(&self) -> Result<HealthResponse, Error> {
        let url = self.url(&["health"])?;
        let health: HealthResponse = self.get(url).await?;
        if !health.is_healthy() {
            debug!(status = %health.status, "service answered but is not healthy");
            return Err(Error::Unhealthy {
                status: health.status,
            });
        }
        Ok(health)
    }
}
