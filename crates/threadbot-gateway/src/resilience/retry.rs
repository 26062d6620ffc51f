//! Retry with exponential backoff and jitter

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Backoff schedule for retried operations
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Relative jitter; 0.2 spreads each delay over [0.8, 1.2] of its nominal value
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(120),
            multiplier: 2.0,
            jitter: 0.2,
        }
    }
}

impl BackoffConfig {
    /// Disable jitter, mostly for deterministic tests
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Nominal delay after failed attempt number `attempt` (1-based)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Delay after failed attempt `attempt` with jitter applied
    #[must_use]
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        apply_jitter(self.delay_for_attempt(attempt), self.jitter)
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Scale `delay` by a random factor in `[1 - jitter, 1 + jitter]`
#[must_use]
pub fn apply_jitter(delay: Duration, jitter: f64) -> Duration {
    let jitter = jitter.clamp(0.0, 1.0);
    if jitter == 0.0 || delay.is_zero() {
        return delay;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    delay.mul_f64(factor)
}

/// Run `operation` until it succeeds or `config.max_attempts` attempts have failed
///
/// The operation receives the 1-based attempt number. Exhaustion returns the last error.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &BackoffConfig, operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_with_backoff_if(config, |_| true, operation).await
}

/// Like [`retry_with_backoff`], but stops early when `should_retry` rejects an error
pub async fn retry_with_backoff_if<F, Fut, T, E, P>(
    config: &BackoffConfig,
    mut should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
    E: Display,
{
    let max_attempts = config.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let error = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !should_retry(&error) {
            tracing::debug!(attempt, error = %error, "Error is not retryable");
            return Err(error);
        }
        if attempt >= max_attempts {
            return Err(error);
        }

        let delay = config.jittered_delay(attempt);
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis(),
            error = %error,
            "Attempt failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_default_schedule() {
        let config = BackoffConfig::default();
        assert_eq!(config.max_attempts, 10);
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(config.delay_for_attempt(7), Duration::from_secs(64));
        assert_eq!(config.delay_for_attempt(8), Duration::from_secs(120)); // capped
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_secs(120));
    }

    #[test]
    fn test_zero_attempt_uses_base_delay() {
        let config = BackoffConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_bounds() {
        let base = Duration::from_secs(10);
        for _ in 0..100 {
            let delay = apply_jitter(base, 0.2);
            assert!(delay >= Duration::from_secs(8), "{delay:?} below bound");
            assert!(delay <= Duration::from_secs(12), "{delay:?} above bound");
        }
        assert_eq!(apply_jitter(base, 0.0), base);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let config = BackoffConfig {
            max_attempts: 4,
            ..Default::default()
        };
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), String> = retry_with_backoff(&config, |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {attempt}")) }
        })
        .await;

        assert_eq!(result, Err("failure 4".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_failures() {
        let config = BackoffConfig::default().without_jitter();
        let start = tokio::time::Instant::now();

        let result: Result<u32, String> = retry_with_backoff(&config, |attempt| async move {
            if attempt < 3 {
                Err("not yet".to_string())
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        // 1s after the first failure, 2s after the second
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3) && elapsed < Duration::from_millis(3_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let config = BackoffConfig::default();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let result: Result<(), &str> = retry_with_backoff_if(
            &config,
            |error| *error != "unauthorized",
            |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err("unauthorized") }
            },
        )
        .await;

        assert_eq!(result, Err("unauthorized"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
