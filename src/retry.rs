//! Backoff policy for retrying candidate lock acquisition.
//!
//! Only `LockUnavailable` is ever retried; commits are never retried
//! automatically.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// Retry Policy Configuration
// ============================================================================

/// Strategy for calculating retry delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries.
    Fixed,
    /// Linear increase: delay * attempt.
    Linear,
    /// Exponential increase: delay * multiplier^attempt.
    Exponential,
    /// Exponential with random jitter.
    #[default]
    ExponentialWithJitter,
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 means no retries).
    pub max_retries: u32,

    /// Initial delay between retries.
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (caps exponential growth).
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// Backoff strategy to use.
    pub strategy: BackoffStrategy,

    /// Multiplier for exponential/linear backoff.
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0).
    pub jitter: f64,

    /// Total time budget for all attempts combined.
    #[serde(with = "humantime_serde")]
    pub total_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::default(),
            multiplier: 2.0,
            jitter: 0.25,
            total_timeout: None,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff strategy.
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the jitter factor.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Set the total timeout for all attempts.
    pub fn with_total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }

    /// Calculate the delay before retry number `attempt` (0-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = match self.strategy {
            BackoffStrategy::Fixed => self.initial_delay,
            BackoffStrategy::Linear => self
                .initial_delay
                .mul_f64(1.0 + (attempt as f64 * (self.multiplier - 1.0))),
            BackoffStrategy::Exponential | BackoffStrategy::ExponentialWithJitter => self
                .initial_delay
                .mul_f64(self.multiplier.powi(attempt.min(32) as i32)),
        };

        let capped_delay = base_delay.min(self.max_delay);

        if self.strategy == BackoffStrategy::ExponentialWithJitter && self.jitter > 0.0 {
            let jitter_range = capped_delay.as_secs_f64() * self.jitter;
            let jitter_value = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            let jittered_secs = (capped_delay.as_secs_f64() + jitter_value).max(0.0);
            Duration::from_secs_f64(jittered_secs)
        } else {
            capped_delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff() {
        let policy = RetryPolicy::new()
            .with_strategy(BackoffStrategy::Fixed)
            .with_initial_delay(Duration::from_millis(100));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(100));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::new()
            .with_strategy(BackoffStrategy::Exponential)
            .with_initial_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(1));

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy::new()
            .with_initial_delay(Duration::from_millis(1000))
            .with_jitter(0.5);

        for _ in 0..50 {
            let delay = policy.delay_for_attempt(0);
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn test_deserialize_with_humantime() {
        let policy: RetryPolicy =
            toml::from_str("max_retries = 2\ninitial_delay = \"250ms\"\nstrategy = \"fixed\"\n")
                .unwrap();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.initial_delay, Duration::from_millis(250));
        assert_eq!(policy.strategy, BackoffStrategy::Fixed);
        assert_eq!(policy.max_delay, Duration::from_secs(30));
    }
}
