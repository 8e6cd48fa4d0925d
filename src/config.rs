//! YAML configuration for the fetch pool.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock pool: 5 workers, 3 attempts, 2s linear backoff, 30s per attempt and
//! 2s for the overlay step. Validation happens when the values are turned into
//! a [`RetryPolicy`] or an aggregator, so a zero pool size or zero attempts is
//! reported before any fetch starts.
//!
//! ```yaml
//! pool_size: 8
//! max_attempts: 4
//! base_delay_ms: 1500
//! batch_timeout_ms: 600000
//! user_agent: "Mozilla/5.0 (X11; Linux x86_64)"
//! ```

use crate::error::ConfigError;
use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::worker::{AttemptTimeouts, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_OVERLAY_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/125.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of concurrent fetch slots.
    pub pool_size: usize,
    /// Total attempts per URL, including the first.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `n * base_delay_ms`.
    pub base_delay_ms: u64,
    /// Upper bound of random jitter added to each backoff. 0 disables it.
    pub backoff_jitter_ms: u64,
    pub attempt_timeout_ms: u64,
    pub overlay_timeout_ms: u64,
    /// Cancel the whole batch after this long. Unset means no limit.
    pub batch_timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            pool_size: crate::aggregator::DEFAULT_POOL_SIZE,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            backoff_jitter_ms: 0,
            attempt_timeout_ms: DEFAULT_ATTEMPT_TIMEOUT.as_millis() as u64,
            overlay_timeout_ms: DEFAULT_OVERLAY_TIMEOUT.as_millis() as u64,
            batch_timeout_ms: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(
            RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))?
                .with_jitter(Duration::from_millis(self.backoff_jitter_ms)),
        )
    }

    pub fn attempt_timeouts(&self) -> AttemptTimeouts {
        AttemptTimeouts {
            load: Duration::from_millis(self.attempt_timeout_ms),
            overlay: Duration::from_millis(self.overlay_timeout_ms),
        }
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        self.batch_timeout_ms.map(Duration::from_millis)
    }
}

/// Load a [`FetchConfig`] from a YAML file.
///
/// Keys missing from the file keep their defaults, and an empty file yields
/// [`FetchConfig::default`].
///
/// # Errors
///
/// Returns [`ConfigError::Read`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not valid YAML for a [`FetchConfig`].
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config(path: impl AsRef<Path>) -> Result<FetchConfig, ConfigError> {
    let path = path.as_ref();
    let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config = FetchConfig::from_yaml(&yaml)?;
    info!(
        pool_size = config.pool_size,
        max_attempts = config.max_attempts,
        base_delay_ms = config.base_delay_ms,
        "Loaded configuration"
    );
    Ok(config)
}
