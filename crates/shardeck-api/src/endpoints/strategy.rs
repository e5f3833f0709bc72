// Sharding strategy endpoints.

use tracing::debug;

use crate::client::ShardClient;
use crate::error::Error;
use crate::models::{CurrentStrategy, Strategy, StrategyChange};

impl ShardClient {
    /// Switch the active sharding strategy.
    ///
    /// `PUT /strategy/{name}`
    pub async fn set_strategy(&self, strategy: Strategy) -> Result<StrategyChange, Error> {
        let url = self.url(&["strategy", strategy.as_str()])?;
        debug!(%strategy, "switching strategy");
        self.put(url).await
    }

    /// The currently active strategy.
    ///
    /// `GET /strategy/current`
    pub async fn current_strategy(&self) -> Result<CurrentStrategy, Error> {
        let url = self.url(&["strategy", "current"])?;
        debug!("fetching current strategy");
        self.get(url).await
    }
}
