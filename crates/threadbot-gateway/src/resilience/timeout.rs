//! Timeout and fallback combinators

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Operation timed out after {after:?}")]
pub struct TimeoutError {
    pub after: Duration,
}

/// Race `future` against `duration`
pub async fn with_timeout<F>(duration: Duration, future: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError { after: duration })
}

/// Race `future` against `duration`, returning `fallback` on timeout
pub async fn with_timeout_or<F>(duration: Duration, future: F, fallback: F::Output) -> F::Output
where
    F: Future,
{
    with_timeout(duration, future).await.unwrap_or(fallback)
}

/// Like [`with_timeout_or`] with a lazily built fallback
pub async fn with_timeout_or_else<F, G>(duration: Duration, future: F, fallback: G) -> F::Output
where
    F: Future,
    G: FnOnce() -> F::Output,
{
    match with_timeout(duration, future).await {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(timeout_ms = e.after.as_millis(), "Falling back after timeout");
            fallback()
        }
    }
}
