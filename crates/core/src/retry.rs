//! Retry policy with exponential backoff
//!
//! Decides whether a failed call should be attempted again:
//! - Client-class failures (4xx) are never retried
//! - 401 stops immediately regardless of attempt count
//! - Server-class failures (5xx) and failures without a status are retried
//!   up to the configured ceiling
//! - Validation failures are never retried
//!
//! The request executor performs exactly one call; the orchestration layer
//! consults a [`RetryPolicy`] between attempts.
//!
//! # Example
//!
//! ```rust
//! use storefront_core::error::AppError;
//! use storefront_core::retry::{RetryConfig, RetryPolicy, StatusRetryPolicy};
//!
//! let policy = StatusRetryPolicy::new(RetryConfig::default());
//! assert!(policy.should_retry(1, &AppError::http(503, "unavailable")));
//! assert!(!policy.should_retry(1, &AppError::http(404, "missing")));
//! ```

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add up to 25% random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    /// Three attempts in total (two retries), the general query default
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Short delays, for local development
    pub fn quick() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// More attempts with longer delays, for production
    pub fn patient() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Cart mutations: up to three retries
    pub fn cart_mutation() -> Self {
        Self {
            max_attempts: 4,
            ..Self::default()
        }
    }

    /// Single attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter: false,
        }
    }

    /// Same attempt ceiling, no waiting between attempts
    #[must_use]
    pub fn without_backoff(mut self) -> Self {
        self.initial_delay = Duration::ZERO;
        self.max_delay = Duration::ZERO;
        self.jitter = false;
        self
    }

    /// Override the attempt ceiling
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Calculate the delay before retry number `attempt` (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            delay_secs * (1.0 + jitter_fraction() * 0.25)
        } else {
            delay_secs
        };

        Duration::from_secs_f64(final_delay.max(0.0))
    }
}

/// Pseudo-random fraction in `[0.0, 1.0)`
fn jitter_fraction() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u32(nanos);
    f64::from(u32::try_from(hasher.finish() % 1000).unwrap_or(0)) / 1000.0
}

/// Strategy consulted between attempts
pub trait RetryPolicy: Send + Sync {
    /// Whether to try again after `attempt` attempts (1-based) ended in `error`
    fn should_retry(&self, attempt: u32, error: &AppError) -> bool;

    /// How long to wait before the next attempt
    fn delay_for(&self, attempt: u32) -> Duration;
}

/// Status-driven retry policy
#[derive(Debug, Clone, Default)]
pub struct StatusRetryPolicy {
    config: RetryConfig,
}

impl StatusRetryPolicy {
    /// Policy driven by `config`
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Underlying configuration
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl RetryPolicy for StatusRetryPolicy {
    fn should_retry(&self, attempt: u32, error: &AppError) -> bool {
        if error.is_unauthorized() || error.is_validation() {
            return false;
        }
        if attempt >= self.config.max_attempts {
            return false;
        }
        match error.status {
            Some(status) if (400..500).contains(&status) => false,
            Some(status) => status >= 500,
            None => true,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.config.delay_for_attempt(attempt)
    }
}
