// shardeck-api: Async Rust client for the sharding management service

pub mod client;
mod endpoints;
pub mod error;
pub mod models;
pub mod transport;

pub use client::ShardClient;
pub use error::{Error, ErrorKind};
pub use models::{
    CurrentStrategy, HealthResponse, Metrics, NewUser, ShardStats, ShardsInfo, Strategy,
    StrategyChange, StrategyPerformance, User, UserStats,
};
pub use transport::TransportConfig;
