// Endpoint groups, implemented as inherent methods on `ShardClient`.

mod health;
mod monitoring;
mod shards;
mod strategy;
mod users;
