// ── Dashboard runtime configuration ──
//
// Pure tuning values. No disk or environment access happens here;
// `shardeck-config` resolves profiles and hands the result over.

use std::time::Duration;

use serde::Serialize;

/// Default interval between stats refreshes while healthy.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Default interval for the metrics monitor.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(15);

/// Default number of health attempts per probe run.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 3;

/// Default fixed delay between failed health attempts.
pub const DEFAULT_PROBE_DELAY: Duration = Duration::from_secs(2);

/// Bounded fixed-delay retry policy for the health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProbePolicy {
    /// Total attempts, including the first one. Never below 1.
    pub max_attempts: u32,
    /// Constant wait between attempts.
    pub delay: Duration,
}

impl Default for ProbePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_PROBE_ATTEMPTS,
            delay: DEFAULT_PROBE_DELAY,
        }
    }
}

impl ProbePolicy {
    /// Build a policy; `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Timing knobs for a [`Dashboard`](crate::Dashboard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DashboardConfig {
    /// Stats refresh interval while the system is healthy.
    pub poll_interval: Duration,
    /// Refresh interval of the metrics monitor.
    pub metrics_interval: Duration,
    pub probe: ProbePolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            metrics_interval: DEFAULT_METRICS_INTERVAL,
            probe: ProbePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let config = DashboardConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert_eq!(config.metrics_interval, Duration::from_secs(15));
        assert_eq!(config.probe.max_attempts, 3);
        assert_eq!(config.probe.delay, Duration::from_millis(2000));
    }

    #[test]
    fn zero_attempts_clamped_to_one() {
        assert_eq!(ProbePolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(ProbePolicy::new(5, Duration::ZERO).max_attempts, 5);
    }
}
