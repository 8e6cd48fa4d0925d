//! Error types shared by the fetch pipeline.
//!
//! Per-URL failures are always [`FetchError`]s and are recovered into a
//! [`FetchFailure`](crate::models::FetchFailure) by the worker; they never
//! escape [`FetchAggregator::fetch_all`](crate::aggregator::FetchAggregator::fetch_all).
//! Only invalid configuration ([`ConfigError`]) fails fast.

use std::time::Duration;
use thiserror::Error;

/// Why a single fetch attempt (or a whole task) did not produce content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Network, transport or automation failure. Consumes one attempt.
    #[error("transient fetch error: {0}")]
    Transient(String),
    /// The attempt did not finish within the per-attempt timeout.
    #[error("fetch attempt timed out after {0:?}")]
    Timeout(Duration),
    /// Malformed input or an unrecoverable client failure. Never retried.
    #[error("fatal fetch error: {0}")]
    Fatal(String),
    /// The batch was cancelled before this URL reached a terminal outcome.
    #[error("fetch cancelled before completion")]
    Cancelled,
}

impl FetchError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }
}

/// Invalid configuration, reported when a policy or aggregator is built.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("pool size must be at least 1 (got {0})")]
    InvalidPoolSize(usize),
    #[error("max attempts must be at least 1 (got {0})")]
    InvalidMaxAttempts(u32),
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::transient("connection reset").is_retryable());
        assert!(FetchError::Timeout(Duration::from_secs(2)).is_retryable());
        assert!(!FetchError::fatal("bad url").is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "fetch attempt timed out after 1.5s");
        assert_eq!(
            ConfigError::InvalidPoolSize(0).to_string(),
            "pool size must be at least 1 (got 0)"
        );
    }
}
