// User record endpoints.

use tracing::debug;

use crate::client::ShardClient;
use crate::error::Error;
use crate::models::{NewUser, User};

impl ShardClient {
    /// Create a user; the service routes it to a shard by `shard_key`.
    ///
    /// `POST /users/`
    pub async fn create_user(&self, user: &NewUser) -> Result<User, Error> {
        let url = self.url(&["users", ""])?;
        debug!(username = %user.username, shard_key = %user.shard_key, "creating user");
        self.post(url, user).await
    }

    /// Fetch one user by id. The service searches every shard.
    ///
    /// `GET /users/{id}`
    pub async fn get_user(&self, id: i64) -> Result<User, Error> {
        let url = self.url(&["users", &id.to_string()])?;
        debug!(id, "fetching user");
        self.get(url).await
    }

    /// List users routed to the shard owning `shard_key`.
    ///
    /// `GET /users/by-key/{shard_key}`
    pub async fn users_by_key(&self, shard_key: &str) -> Result<Vec<User>, Error> {
        let url = self.url(&["users", "by-key", shard_key])?;
        debug!(shard_key, "listing users by shard key");
        self.get(url).await
    }
}
