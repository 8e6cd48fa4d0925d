//! Retry decisions with linear backoff.
//!
//! [`RetryPolicy`] is pure decision logic: given how many attempts a task has
//! made, it answers whether another attempt is allowed and how long to wait
//! before it.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay(attempt) = base_delay * attempt + random_jitter(0..=jitter)
//! ```
//!
//! With the defaults (3 attempts, 2s base, no jitter) a task that keeps
//! failing waits 2s after the first attempt and 4s after the second.

use crate::error::ConfigError;
use rand::{Rng, rng};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// How many times a task may be attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first one.
    max_attempts: u32,
    /// Delay after the first failed attempt; grows linearly.
    base_delay: Duration,
    /// Upper bound of random jitter added to every delay.
    jitter: Duration,
}

impl RetryPolicy {
    /// Build a policy, rejecting `max_attempts == 0`.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Total attempts per URL, including the first
    /// * `base_delay` - Backoff unit; the wait before attempt `n + 1` is `n * base_delay`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMaxAttempts`] when `max_attempts` is zero.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            jitter: Duration::ZERO,
        })
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// `true` while `attempt < max_attempts`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Wait inserted after attempt number `attempt` failed.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(attempt);
        if self.jitter.is_zero() {
            return delay;
        }
        let max_ms = self.jitter.as_millis().min(u128::from(u64::MAX)) as u64;
        let jitter_ms: u64 = rng().random_range(0..=max_ms);
        delay.saturating_add(Duration::from_millis(jitter_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            jitter: Duration::ZERO,
        }
    }
}
