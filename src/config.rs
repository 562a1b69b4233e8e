//! Configuration management

use std::path::Path;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::sink::Level;
use crate::{Error, Result};

/// Default time a seen message suppresses repeats
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(10);

/// Default cap on distinct tracked messages
pub const DEFAULT_MAX_HISTORY: usize = 1024;

/// Default period of the background sweeper
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Deduplication configuration, fixed for the lifetime of a decorator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// How long a seen message suppresses repeats
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
    /// Maximum number of distinct messages tracked before eviction
    pub max_history: usize,
    /// Records at or below this level are deduplicated; more severe ones always pass
    pub dedup_level: Level,
    /// Period of the expired-entry sweep
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            retention: DEFAULT_RETENTION,
            max_history: DEFAULT_MAX_HISTORY,
            dedup_level: Level::Info,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl DedupConfig {
    /// Load configuration from an optional YAML file and the environment.
    ///
    /// Environment variables use the `DEDUPLOG_` prefix, e.g.
    /// `DEDUPLOG_RETENTION=30s` or `DEDUPLOG_MAX_HISTORY=4096`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("DEDUPLOG_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make deduplication meaningless
    pub fn validate(&self) -> Result<()> {
        if self.retention.is_zero() {
            return Err(Error::config("retention must be greater than zero"));
        }
        if self.max_history == 0 {
            return Err(Error::config("max_history must be greater than zero"));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::config("sweep_interval must be greater than zero"));
        }
        Ok(())
    }

    /// Builder: set the retention period
    #[must_use]
    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Builder: set the maximum history size
    #[must_use]
    pub fn max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Builder: set the deduplication level threshold
    #[must_use]
    pub fn dedup_level(mut self, level: Level) -> Self {
        self.dedup_level = level;
        self
    }

    /// Builder: set the sweeper period
    #[must_use]
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}
