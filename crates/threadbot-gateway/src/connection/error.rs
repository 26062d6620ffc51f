//! Transport error types

use super::ConnectionState;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the connection transport
///
/// All of them are retryable from the supervisor's point of view.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {url}: {cause}")]
    Connect { url: String, cause: String },

    #[error("Timed out connecting to {url} after {timeout:?}")]
    ConnectTimeout { url: String, timeout: Duration },

    /// Operation requires an open socket
    #[error("Connection is not open ({state})")]
    State { state: ConnectionState },

    #[error("Failed to send frame: {0}")]
    Send(String),
}

impl TransportError {
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }
}
