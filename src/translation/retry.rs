/*!
 * Retry timing for failed batch attempts.
 */

use std::time::Duration;

/// Retry budget and delay schedule for one batch
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Automatic retries after the first attempt before escalation
    pub max_retries: u32,
    /// Delay before the first retry
    pub retry_delay: Duration,
    /// Growth factor per failed attempt, 1.0 keeps the delay fixed
    pub backoff_multiplier: f64,
    /// Cap applied when the delay grows
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Fixed delay between every attempt
    pub fn fixed(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            backoff_multiplier: 1.0,
            max_delay: retry_delay,
        }
    }

    /// Whether another automatic attempt is allowed after `failed_attempts` failures
    pub fn should_retry(&self, failed_attempts: u32) -> bool {
        failed_attempts <= self.max_retries
    }

    /// Delay to wait after the `failed_attempts`-th consecutive failure (1-based)
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        if self.backoff_multiplier <= 1.0 {
            return self.retry_delay;
        }
        let exponent = failed_attempts.saturating_sub(1).min(32) as i32;
        let scaled = self.retry_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}
