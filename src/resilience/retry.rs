// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry logic with exponential backoff.
//!
//! A failure after attempt `n` waits `initial_delay * factor^(n-1)` before the
//! next attempt. With the [`RetryConfig::api`] preset that is `2^n` seconds.
//!
//! # Example
//!
//! ```
//! use pharmalink_explorer::resilience::RetryConfig;
//! use std::time::Duration;
//!
//! let api = RetryConfig::api(3);
//! assert_eq!(api.max_attempts, 3);
//! assert_eq!(api.initial_delay, Duration::from_secs(2));
//!
//! // Zero attempts still runs the operation once
//! assert_eq!(RetryConfig::api(0).max_attempts, 1);
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for request retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Total tries including the first one. Never below 1.
    pub max_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::api(3)
    }
}

impl RetryConfig {
    /// Backend requests: 2s, 4s, 8s, ... between `attempts` tries. Uncapped.
    #[must_use]
    pub fn api(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1) as usize,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::MAX,
            factor: 2.0,
        }
    }

    /// Single attempt, no waiting.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            factor: 1.0,
        }
    }

    /// Fast retry for tests (minimal delays)
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            factor: 2.0,
        }
    }

    /// Delay after the given (1-based) failed attempt.
    #[must_use]
    pub fn delay_after(&self, attempt: usize) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..attempt {
            delay = self.next_delay(delay);
        }
        delay
    }

    /// Grow `delay` by `factor`, saturating at `max_delay`.
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` until it succeeds or attempts run out, returning the last error.
pub async fn retry<F, Fut, T, E>(
    operation_name: &str,
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay.min(config.max_delay);
    let mut attempts = 0;

    loop {
        match operation().await {
            Ok(val) => {
                if attempts > 0 {
                    info!("Operation '{}' succeeded after {} retries", operation_name, attempts);
                }
                return Ok(val);
            }
            Err(err) => {
                attempts += 1;
                crate::metrics::record_retry(operation_name);

                if attempts >= max_attempts {
                    warn!(
                        "Operation '{}' failed after {} attempts: {}",
                        operation_name, attempts, err
                    );
                    return Err(err);
                }

                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}. Retrying in {:?}...",
                    operation_name, attempts, max_attempts, err, delay
                );

                sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError(String);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let result: Result<i32, TestError> = retry(
            "test_op",
            &RetryConfig::test(),
            || async { Ok(42) },
        ).await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, TestError> = retry(
            "test_op",
            &RetryConfig::test(),
            || {
                let a = attempts_clone.clone();
                async move {
                    let count = a.fetch_add(1, Ordering::SeqCst) + 1;
                    if count < 3 {
                        Err(TestError(format!("fail {}", count)))
                    } else {
                        Ok(42)
                    }
                }
            },
        ).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<i32, TestError> = retry(
            "test_op",
            &RetryConfig::test(),
            || {
                let a = attempts_clone.clone();
                async move {
                    let count = a.fetch_add(1, Ordering::SeqCst) + 1;
                    Err(TestError(format!("fail {}", count)))
                }
            },
        ).await;

        assert_eq!(result.unwrap_err().0, "fail 3");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_api_backoff_is_powers_of_two() {
        let start = tokio::time::Instant::now();
        let result: Result<(), TestError> = retry(
            "test_op",
            &RetryConfig::api(3),
            || async { Err(TestError("down".into())) },
        ).await;

        assert!(result.is_err());
        // 2s after the first failure, 4s after the second, none after the last
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = attempts.clone();
        let config = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::once()
        };

        let _: Result<(), TestError> = retry("test_op", &config, || {
            let a = attempts_clone.clone();
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Err(TestError("no".into()))
            }
        }).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_after() {
        let config = RetryConfig::api(5);
        assert_eq!(config.delay_after(1), Duration::from_secs(2));
        assert_eq!(config.delay_after(2), Duration::from_secs(4));
        assert_eq!(config.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn test_api_delay_is_not_capped() {
        let config = RetryConfig::api(10);
        assert_eq!(config.delay_after(6), Duration::from_secs(64));
        assert_eq!(config.delay_after(8), Duration::from_secs(256));
        // Far beyond any representable delay it saturates instead of panicking
        assert_eq!(config.delay_after(2_000), Duration::MAX);
    }

    #[test]
    fn test_delay_caps_at_max() {
        let config = RetryConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            factor: 10.0,
            max_attempts: 5,
        };
        assert_eq!(config.delay_after(2), Duration::from_secs(5));
    }
}
