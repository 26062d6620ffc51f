//! Circuit breaker
//!
//! Closed until `failure_threshold` consecutive failures, then open for `cooldown`.
//! Once the cooldown has elapsed a single trial call is let through: success closes the
//! breaker, failure reopens it and restarts the cooldown clock.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Error from a call made through a [`CircuitBreaker`]
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// Call rejected without running the operation
    #[error("Circuit breaker is open, retry in {cooldown_remaining:?}")]
    Open { cooldown_remaining: Duration },

    /// The operation ran and failed
    #[error("{0}")]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// The operation's own error, if it ran
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Open { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    open: bool,
    trial_in_flight: bool,
}

/// Circuit breaker owned by a single call site
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState::default()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.state.lock().consecutive_failures
    }

    /// Run `operation` unless the breaker is open
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut permit = self.acquire()?;

        let result = operation().await;
        permit.settled = true;
        match result {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Close the breaker and clear the failure count
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if state.open {
            tracing::info!(breaker = %self.name, "Circuit breaker closed");
        }
        *state = BreakerState::default();
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        state.last_failure = Some(Instant::now());
        state.trial_in_flight = false;

        if state.consecutive_failures >= self.config.failure_threshold {
            if !state.open {
                tracing::warn!(
                    breaker = %self.name,
                    failures = state.consecutive_failures,
                    cooldown_secs = self.config.cooldown.as_secs(),
                    "Circuit breaker opened"
                );
            }
            state.open = true;
        }
    }

    /// Time until the next call may pass, if the breaker is open
    #[must_use]
    pub fn time_until_retry(&self) -> Option<Duration> {
        let state = self.state.lock();
        if !state.open {
            return None;
        }
        Some(self.cooldown_remaining(&state))
    }

    fn acquire<E>(&self) -> Result<Permit<'_>, CircuitBreakerError<E>> {
        let mut state = self.state.lock();
        if !state.open {
            return Ok(Permit::normal(self));
        }

        let cooldown_remaining = self.cooldown_remaining(&state);
        if !cooldown_remaining.is_zero() || state.trial_in_flight {
            return Err(CircuitBreakerError::Open { cooldown_remaining });
        }

        tracing::info!(breaker = %self.name, "Circuit breaker half-open, allowing trial call");
        state.trial_in_flight = true;
        Ok(Permit::trial(self))
    }

    fn cooldown_remaining(&self, state: &BreakerState) -> Duration {
        state.last_failure.map_or(Duration::ZERO, |at| {
            self.config.cooldown.saturating_sub(at.elapsed())
        })
    }
}

/// Releases the trial slot if a trial call is dropped before it settles
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    settled: bool,
}

impl<'a> Permit<'a> {
    fn normal(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            trial: false,
            settled: false,
        }
    }

    fn trial(breaker: &'a CircuitBreaker) -> Self {
        Self {
            breaker,
            trial: true,
            settled: false,
        }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.settled {
            self.breaker.state.lock().trial_in_flight = false;
        }
    }
}
