//! Resilience combinators
//!
//! Retry with backoff, circuit breaking and timeouts, shared by the gateway supervisor and
//! outbound HTTP calls.

mod circuit_breaker;
mod retry;
mod timeout;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
pub use retry::{apply_jitter, retry_with_backoff, retry_with_backoff_if, BackoffConfig};
pub use timeout::{with_timeout, with_timeout_or, with_timeout_or_else, TimeoutError};
