// Wire types for the sharding service `/api/v1` contract.
//
// Field names match the service's snake_case JSON. Unknown fields are
// retained in `extra` maps where the service is known to add more.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ── Health ──────────────────────────────────────────────────────────

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

// ── Strategy ────────────────────────────────────────────────────────

/// Sharding strategies the service can switch between.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Strategy {
    Hash,
    Range,
    List,
    Directory,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// `PUT /strategy/{name}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyChange {
    #[serde(default)]
    pub message: String,
    pub current_strategy: String,
}

/// `GET /strategy/current`
///
/// The service returns its full shard overview here; only the strategy
/// name is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentStrategy {
    pub current_strategy: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Shards ──────────────────────────────────────────────────────────

/// Per-shard statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardStats {
    #[serde(default)]
    pub user_count: u64,
    #[serde(default)]
    pub db_size_mb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_size_bytes: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `GET /shards/info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardsInfo {
    #[serde(default)]
    pub shards: BTreeMap<String, ShardStats>,
    pub total_shards: u32,
    pub current_strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_users: Option<u64>,
}

/// `GET /stats/users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total_users: u64,
    #[serde(default)]
    pub users_per_shard: BTreeMap<String, u64>,
    pub strategy: String,
}

// ── Users ───────────────────────────────────────────────────────────

/// `POST /users/` request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub shard_key: String,
}

/// A user record as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub shard_key: String,
    #[serde(deserialize_with = "service_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "optional_service_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    pub shard_name: String,
}

// ── Monitoring ──────────────────────────────────────────────────────

/// Per-strategy operation timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformance {
    #[serde(default)]
    pub total_operations: u64,
    #[serde(default)]
    pub average_time_ms: f64,
    #[serde(default)]
    pub total_time_seconds: f64,
}

/// `GET /monitoring/metrics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub shard_statistics: BTreeMap<String, ShardStats>,
    #[serde(default)]
    pub performance_metrics: BTreeMap<String, StrategyPerformance>,
    pub current_strategy: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_times: Option<serde_json::Value>,
}

impl Metrics {
    /// Mean of `average_time_ms` over strategies that recorded operations.
    pub fn average_response_ms(&self) -> Option<f64> {
        let active: Vec<f64> = self
            .performance_metrics
            .values()
            .filter(|p| p.total_operations > 0)
            .map(|p| p.average_time_ms)
            .collect();
        if active.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
        let count = active.len() as f64;
        Some(active.iter().sum::<f64>() / count)
    }
}

// ── Error payloads ──────────────────────────────────────────────────

/// FastAPI-style error body: `{"detail": "..."}` or
/// `{"detail": [{"loc": [...], "msg": "..."}]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Flatten the detail into one human-readable line.
    pub(crate) fn into_detail(self) -> Option<String> {
        match self.detail {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::Array(items) if !items.is_empty() => {
                let parts: Vec<String> = items.iter().map(validation_entry).collect();
                Some(parts.join("; "))
            }
            serde_json::Value::Null | serde_json::Value::String(_) | serde_json::Value::Array(_) => {
                None
            }
            other => Some(other.to_string()),
        }
    }
}

fn validation_entry(item: &serde_json::Value) -> String {
    let msg = item
        .get("msg")
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| item.to_string(), String::from);
    let loc = item
        .get("loc")
        .and_then(serde_json::Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter(|p| p.as_str() != Some("body"))
                .map(|p| p.as_str().map_or_else(|| p.to_string(), String::from))
                .collect::<Vec<_>>()
                .join(".")
        })
        .unwrap_or_default();
    if loc.is_empty() {
        msg
    } else {
        format!("{loc}: {msg}")
    }
}

// ── Timestamp parsing ───────────────────────────────────────────────

/// The service emits naive ISO-8601 timestamps (no offset) from Python;
/// accept both naive (treated as UTC) and RFC 3339.
fn parse_service_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn service_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_service_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
}

fn optional_service_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_service_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'"))),
    }
}
