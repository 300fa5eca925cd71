//! Runtime settings for the command core.

use std::env;
use std::error::Error;
use std::fmt;

use chrono::Duration;
use serde::Deserialize;

use crate::idempotency::IDEMPOTENCY_TTL_SECS;

/// Environment variable overriding the replay window.
pub const IDEMPOTENCY_TTL_ENV: &str = "WORKLOG_IDEMPOTENCY_TTL_SECS";

/// Upper bound for the replay window: one year.
pub const MAX_IDEMPOTENCY_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// A rejected setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A setting could not be parsed.
    Invalid { key: &'static str, value: String },
    /// A setting parsed but lies outside the accepted range.
    OutOfRange {
        key: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
            ConfigError::OutOfRange {
                key,
                value,
                min,
                max,
            } => write!(
                f,
                "{} must be between {} and {}, got {}",
                key, min, max, value
            ),
        }
    }
}

impl Error for ConfigError {}

/// Checked settings. Every way of building one goes through the same bounds,
/// so a `Config` in hand is always usable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct Config {
    idempotency_ttl_secs: i64,
}

/// Wire shape before validation.
#[derive(Deserialize)]
#[serde(default)]
struct RawConfig {
    idempotency_ttl_secs: i64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            idempotency_ttl_secs: IDEMPOTENCY_TTL_SECS,
        }
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Self::default().with_idempotency_ttl_secs(raw.idempotency_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idempotency_ttl_secs: IDEMPOTENCY_TTL_SECS,
        }
    }
}

impl Config {
    /// Defaults, overridden by `WORKLOG_IDEMPOTENCY_TTL_SECS` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::default();
        match lookup(IDEMPOTENCY_TTL_ENV) {
            Some(raw) => {
                let secs = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ConfigError::Invalid {
                        key: IDEMPOTENCY_TTL_ENV,
                        value: raw.clone(),
                    })?;
                config.with_idempotency_ttl_secs(secs)
            }
            None => Ok(config),
        }
    }

    /// Replace the replay window, rejecting anything outside
    /// `1..=MAX_IDEMPOTENCY_TTL_SECS`.
    pub fn with_idempotency_ttl_secs(self, secs: i64) -> Result<Self, ConfigError> {
        if !(1..=MAX_IDEMPOTENCY_TTL_SECS).contains(&secs) {
            return Err(ConfigError::OutOfRange {
                key: "idempotency_ttl_secs",
                value: secs,
                min: 1,
                max: MAX_IDEMPOTENCY_TTL_SECS,
            });
        }
        Ok(Self {
            idempotency_ttl_secs: secs,
        })
    }

    /// Seconds a stored idempotent result is replayed.
    pub fn idempotency_ttl_secs(&self) -> i64 {
        self.idempotency_ttl_secs
    }

    /// Replay window as a `Duration`.
    pub fn idempotency_ttl(&self) -> Duration {
        Duration::seconds(self.idempotency_ttl_secs)
    }
}
