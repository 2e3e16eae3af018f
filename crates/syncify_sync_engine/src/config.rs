//! Configuration for the sync engine.

use crate::error::{SyncError, SyncResult};
use rand::Rng;
use std::time::Duration;
use syncify_core::MAIN_BRANCH;

/// Shortest allowed polling interval.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Branch to keep synchronized.
    pub branch: String,
    /// Interval between automatic sync attempts.
    pub sync_interval: Duration,
    /// Timeout for a single synchronization attempt.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a configuration for `branch` with default timings.
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            sync_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the sync interval for automatic sync.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks every bound.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidConfig`] naming the first violated bound.
    pub fn validate(&self) -> SyncResult<()> {
        if self.branch.is_empty() {
            return Err(SyncError::InvalidConfig("branch name is empty".into()));
        }
        if self.sync_interval < MIN_SYNC_INTERVAL {
            return Err(SyncError::InvalidConfig(format!(
                "sync interval {:?} is below the minimum of {:?}",
                self.sync_interval, MIN_SYNC_INTERVAL
            )));
        }
        if self.timeout.is_zero() {
            return Err(SyncError::InvalidConfig("timeout must be positive".into()));
        }
        self.retry.validate()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(MAIN_BRANCH)
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    fn validate(&self) -> SyncResult<()> {
        if self.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "retry needs at least one attempt".into(),
            ));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(SyncError::InvalidConfig(format!(
                "backoff multiplier {} is below 1.0",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(SyncError::InvalidConfig(
                "initial retry delay exceeds the maximum".into(),
            ));
        }
        Ok(())
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% on top.
            let jitter = delay_secs * 0.25 * rand::thread_rng().gen::<f64>();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("drafts")
            .with_sync_interval(Duration::from_secs(5))
            .with_timeout(Duration::from_secs(60));

        assert_eq!(config.branch, "drafts");
        assert_eq!(config.sync_interval, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        assert_eq!(config.branch, MAIN_BRANCH);
        assert_eq!(config.sync_interval, Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn interval_below_one_second_is_rejected() {
        let config = SyncConfig::default().with_sync_interval(Duration::from_millis(999));
        assert!(matches!(config.validate(), Err(SyncError::InvalidConfig(_))));
    }

    #[test]
    fn bad_retry_is_rejected() {
        let mut retry = RetryConfig::new(0);
        assert!(SyncConfig::default().with_retry(retry.clone()).validate().is_err());

        retry.max_attempts = 2;
        retry.backoff_multiplier = 0.5;
        assert!(SyncConfig::default().with_retry(retry).validate().is_err());
    }

    #[test]
    fn retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(125));

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_without_jitter_is_exact() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_secs(1))
            .with_jitter(false);
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        let delay = config.delay_for_attempt(5);
        assert!(delay <= Duration::from_millis(6250));
    }
}
