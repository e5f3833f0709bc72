//! Configuration for the shardeck CLI.
//!
//! TOML profiles layered with `SHARDECK_`-prefixed environment overrides,
//! resolved into the transport settings for `shardeck_api` and the timing
//! knobs for `shardeck_core::Dashboard`. The CLI adds its flag overrides
//! through [`Overrides`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use shardeck_api::TransportConfig;
use shardeck_api::transport::DEFAULT_BASE_URL;
use shardeck_core::{DashboardConfig, ProbePolicy};

/// Environment variable that points at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SHARDECK_CONFIG";

/// Profile used when neither a flag nor the file names one.
pub const DEFAULT_PROFILE: &str = "default";

/// Accepted request timeout range, in seconds.
pub const TIMEOUT_RANGE_SECS: std::ops::RangeInclusive<u64> = 1..=120;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    UnknownProfile { name: String, available: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named service profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Zero disables the metrics monitor.
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,

    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,

    #[serde(default = "default_probe_delay")]
    pub probe_delay_ms: u64,

    #[serde(default)]
    pub insecure: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            poll_interval_secs: default_poll_interval(),
            metrics_interval_secs: default_metrics_interval(),
            probe_attempts: default_probe_attempts(),
            probe_delay_ms: default_probe_delay(),
            insecure: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    shardeck_api::transport::DEFAULT_TIMEOUT.as_secs()
}
fn default_poll_interval() -> u64 {
    shardeck_core::config::DEFAULT_POLL_INTERVAL.as_secs()
}
fn default_metrics_interval() -> u64 {
    shardeck_core::config::DEFAULT_METRICS_INTERVAL.as_secs()
}
fn default_probe_attempts() -> u32 {
    shardeck_core::config::DEFAULT_PROBE_ATTEMPTS
}
fn default_probe_delay() -> u64 {
    u64::try_from(shardeck_core::config::DEFAULT_PROBE_DELAY.as_millis()).unwrap_or(2000)
}

/// A named service profile. Unset fields fall back to `[defaults]`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Service root including the API prefix, e.g. `http://db-admin:8000/api/v1`.
    pub url: String,

    pub timeout: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub metrics_interval_secs: Option<u64>,
    pub probe_attempts: Option<u32>,
    pub probe_delay_ms: Option<u64>,

    /// Accept self-signed certificates.
    pub insecure: Option<bool>,

    /// Extra root certificate (PEM).
    pub ca_cert: Option<PathBuf>,
}

impl Config {
    /// Sorted, comma-separated profile names, or `(none)`.
    pub fn profile_names(&self) -> String {
        if self.profiles.is_empty() {
            return "(none)".into();
        }
        self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `SHARDECK_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("io", "shardeck", "shardeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("shardeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the resolved path and the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults ← TOML file at `path` ← `SHARDECK_` env.
///
/// A missing file is not an error. Nested keys use `__` in the
/// environment, e.g. `SHARDECK_DEFAULTS__TIMEOUT=20`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("SHARDECK_")
                .split("__")
                // flag-level variables handled by the CLI itself
                .ignore(&["config", "profile", "url", "timeout", "output"]),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Resolution ──────────────────────────────────────────────────────

/// Values supplied on the command line; each one beats the profile.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub url: Option<String>,
    pub timeout: Option<u64>,
}

/// Everything needed to build a dashboard for one profile.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub profile: String,
    pub transport: TransportConfig,
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Name of the profile in effect: flag, then `default_profile`.
    pub fn active_profile_name(&self, overrides: &Overrides) -> String {
        overrides
            .profile
            .clone()
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.into())
    }

    /// Resolve the active profile plus `overrides` into validated settings.
    ///
    /// A missing `default` profile is allowed and yields `[defaults]` with
    /// the standard local service URL. Any other missing profile is an
    /// error.
    pub fn resolve(&self, overrides: &Overrides) -> Result<Resolved, ConfigError> {
        let name = self.active_profile_name(overrides);
        let fallback = Profile::default();
        let profile = match self.profiles.get(&name) {
            Some(p) => p,
            None if name == DEFAULT_PROFILE => &fallback,
            None => {
                return Err(ConfigError::UnknownProfile {
                    name,
                    available: self.profile_names(),
                });
            }
        };

        let transport = self.resolve_transport(profile, overrides)?;
        let dashboard = self.resolve_dashboard(profile)?;
        Ok(Resolved {
            profile: name,
            transport,
            dashboard,
        })
    }

    fn resolve_transport(
        &self,
        profile: &Profile,
        overrides: &Overrides,
    ) -> Result<TransportConfig, ConfigError> {
        let url_str = overrides
            .url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| Some(profile.url.as_str()).filter(|u| !u.is_empty()))
            .unwrap_or(DEFAULT_BASE_URL);
        let base_url = parse_base_url(url_str)?;

        let timeout = overrides
            .timeout
            .or(profile.timeout)
            .unwrap_or(self.defaults.timeout);
        if !TIMEOUT_RANGE_SECS.contains(&timeout) {
            return Err(invalid(
                "timeout",
                format!(
                    "{timeout}s is outside {}..={}s",
                    TIMEOUT_RANGE_SECS.start(),
                    TIMEOUT_RANGE_SECS.end()
                ),
            ));
        }

        Ok(TransportConfig {
            base_url,
            timeout: Duration::from_secs(timeout),
            accept_invalid_certs: profile.insecure.unwrap_or(self.defaults.insecure),
            ca_cert: profile.ca_cert.clone(),
        })
    }

    fn resolve_dashboard(&self, profile: &Profile) -> Result<DashboardConfig, ConfigError> {
        let poll = profile
            .poll_interval_secs
            .unwrap_or(self.defaults.poll_interval_secs);
        if poll == 0 {
            return Err(invalid("poll_interval_secs", "must be at least 1 second"));
        }

        let attempts = profile
            .probe_attempts
            .unwrap_or(self.defaults.probe_attempts);
        if attempts == 0 {
            return Err(invalid("probe_attempts", "must be at least 1"));
        }

        let metrics = profile
            .metrics_interval_secs
            .unwrap_or(self.defaults.metrics_interval_secs);
        let delay = profile
            .probe_delay_ms
            .unwrap_or(self.defaults.probe_delay_ms);

        Ok(DashboardConfig {
            poll_interval: Duration::from_secs(poll),
            metrics_interval: Duration::from_secs(metrics),
            probe: ProbePolicy::new(attempts, Duration::from_millis(delay)),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid("url", format!("'{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        "http" | "https" => Err(invalid("url", format!("'{raw}' has no host"))),
        other => Err(invalid(
            "url",
            format!("'{raw}' uses unsupported scheme '{other}'"),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    fn check(result: Result<(), ConfigError>) -> figment::error::Result<()> {
        result.map_err(|e| e.to_string().into())
    }

    #[test]
    fn missing_file_resolves_to_local_defaults() {
        Jail::expect_with(|jail| {
            jail.set_env(CONFIG_PATH_ENV, "absent.toml");
            check((|| {
                let resolved = load_config()?.resolve(&Overrides::default())?;
                assert_eq!(resolved.profile, "default");
                assert_eq!(resolved.transport.base_url.as_str(), DEFAULT_BASE_URL);
                assert_eq!(resolved.transport.timeout, Duration::from_secs(10));
                assert_eq!(resolved.dashboard, DashboardConfig::default());
                Ok(())
            })())
        });
    }

    #[test]
    fn profile_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "shardeck.toml",
                r#"
                default_profile = "staging"

                [defaults]
                timeout = 15
                probe_attempts = 5

                [profiles.staging]
                url = "https://staging.example.com/api/v1"
                poll_interval_secs = 60
                probe_delay_ms = 500
                insecure = true
                "#,
            )?;
            jail.set_env(CONFIG_PATH_ENV, "shardeck.toml");

            check((|| {
                let resolved = load_config()?.resolve(&Overrides::default())?;
                assert_eq!(resolved.profile, "staging");
                assert_eq!(
                    resolved.transport.base_url.as_str(),
                    "https://staging.example.com/api/v1"
                );
                assert_eq!(resolved.transport.timeout, Duration::from_secs(15));
                assert!(resolved.transport.accept_invalid_certs);
                assert_eq!(resolved.dashboard.poll_interval, Duration::from_secs(60));
                assert_eq!(resolved.dashboard.probe.max_attempts, 5);
                assert_eq!(resolved.dashboard.probe.delay, Duration::from_millis(500));
                Ok(())
            })())
        });
    }

    #[test]
    fn environment_beats_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "shardeck.toml",
                r#"
                [defaults]
                timeout = 15
                "#,
            )?;
            jail.set_env(CONFIG_PATH_ENV, "shardeck.toml");
            jail.set_env("SHARDECK_DEFAULTS__TIMEOUT", "25");
            jail.set_env("SHARDECK_DEFAULTS__POLL_INTERVAL_SECS", "5");

            let config = load_config().map_err(|e| e.to_string())?;
            assert_eq!(config.defaults.timeout, 25);
            assert_eq!(config.defaults.poll_interval_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn flags_beat_profile() {
        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                url: "http://db:8000/api/v1".into(),
                timeout: Some(30),
                ..Profile::default()
            },
        );

        let resolved = config
            .resolve(&Overrides {
                profile: None,
                url: Some("http://other:9000/api/v1".into()),
                timeout: Some(12),
            })
            .unwrap();
        assert_eq!(resolved.transport.base_url.as_str(), "http://other:9000/api/v1");
        assert_eq!(resolved.transport.timeout, Duration::from_secs(12));
    }

    #[test]
    fn unknown_profile_lists_available() {
        let mut config = Config::default();
        config.profiles.insert("prod".into(), Profile::default());

        let err = config
            .resolve(&Overrides {
                profile: Some("qa".into()),
                ..Overrides::default()
            })
            .unwrap_err();
        assert!(
            matches!(&err, ConfigError::UnknownProfile { name, available } if name == "qa" && available == "prod"),
            "got {err:?}"
        );
    }

    #[test]
    fn validation_rejects_bad_values() {
        let field_of = |config: &Config, overrides: &Overrides| match config.resolve(overrides) {
            Err(ConfigError::Validation { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        };

        let config = Config::default();
        let url = |u: &str| Overrides {
            url: Some(u.into()),
            ..Overrides::default()
        };
        assert_eq!(field_of(&config, &url("not a url")), "url");
        assert_eq!(field_of(&config, &url("ftp://host/api/v1")), "url");

        let timeout = |t| Overrides {
            timeout: Some(t),
            ..Overrides::default()
        };
        assert_eq!(field_of(&config, &timeout(0)), "timeout");
        assert_eq!(field_of(&config, &timeout(121)), "timeout");
        assert!(config.resolve(&timeout(120)).is_ok());

        let mut zero_poll = Config::default();
        zero_poll.defaults.poll_interval_secs = 0;
        assert_eq!(
            field_of(&zero_poll, &Overrides::default()),
            "poll_interval_secs"
        );

        let mut zero_attempts = Config::default();
        zero_attempts.defaults.probe_attempts = 0;
        assert_eq!(
            field_of(&zero_attempts, &Overrides::default()),
            "probe_attempts"
        );
    }

    #[test]
    fn renders_as_toml() {
        let mut config = Config::default();
        config.profiles.insert(
            "local".into(),
            Profile {
                url: "http://localhost:8000/api/v1".into(),
                ..Profile::default()
            },
        );
        let text = config.to_toml().unwrap();
        assert!(text.contains("[profiles.local]"));
        assert!(text.contains("poll_interval_secs = 30"));
        assert_eq!(config.profile_names(), "local");
    }
}
