use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::AppError;

/// How many times a message send is attempted and how long to wait in between.
///
/// The default is a single attempt. Only transport failures, HTTP 429 and 5xx
/// responses are retried: anything else the API rejected will be rejected again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    multiplier: u32,
    max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        multiplier: u32,
        max_backoff: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            multiplier: multiplier.max(1),
            max_backoff,
        }
    }

    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO, 1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given failed attempt (1-based).
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    pub fn should_retry(&self, attempt: u32, error: &AppError) -> bool {
        attempt < self.max_attempts && Self::is_retryable(error)
    }

    pub fn is_retryable(error: &AppError) -> bool {
        match error {
            AppError::TransportFailure(_) => true,
            AppError::ApiFailure { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
            config.backoff_multiplier,
            Duration::from_millis(config.max_backoff_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_failure(status: u16) -> AppError {
        AppError::ApiFailure {
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_default_is_single_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry(1, &AppError::TransportFailure("reset".to_string())));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(100),
            2,
            Duration::from_millis(350),
        );
        assert_eq!(policy.backoff_after(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_after(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_after(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_after(40), Duration::from_millis(350));
    }

    #[test]
    fn test_only_transient_failures_are_retried() {
        let policy = RetryPolicy::new(3, Duration::ZERO, 2, Duration::ZERO);
        assert!(policy.should_retry(1, &AppError::TransportFailure("timeout".to_string())));
        assert!(policy.should_retry(1, &api_failure(503)));
        assert!(policy.should_retry(2, &api_failure(429)));
        assert!(!policy.should_retry(3, &api_failure(503)));
        assert!(!policy.should_retry(1, &api_failure(400)));
        assert!(!policy.should_retry(1, &api_failure(401)));
        assert!(!policy.should_retry(1, &AppError::VerificationMismatch));
    }

    #[test]
    fn test_from_config_clamps_zero_attempts() {
        let config = RetryConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert_eq!(RetryPolicy::from(&config).max_attempts(), 1);
    }
}
