//! Client-level errors

use crate::connection::TransportError;
use crate::discovery::DiscoveryError;
use crate::resilience::CircuitBreakerError;
use std::time::Duration;
use thiserror::Error;
use threadbot_common::AppError;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Bot token rejected by discovery (401) or the gateway (4004)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error(transparent)]
    Discovery(DiscoveryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Connection attempts suspended, circuit breaker open for another {cooldown_remaining:?}")]
    CircuitOpen { cooldown_remaining: Duration },

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Shutdown was requested while connecting
    #[error("Gateway client stopped")]
    Stopped,

    #[error("Gateway supervisor failed: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Retrying cannot help
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::AuthenticationFailed(_) => true,
            Self::Discovery(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Worth another connection attempt
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::CircuitOpen { .. } => true,
            Self::Discovery(e) => !e.is_fatal(),
            _ => false,
        }
    }
}

impl From<DiscoveryError> for GatewayError {
    fn from(error: DiscoveryError) -> Self {
        if error.is_fatal() {
            Self::AuthenticationFailed(error.to_string())
        } else {
            Self::Discovery(error)
        }
    }
}

impl From<CircuitBreakerError<GatewayError>> for GatewayError {
    fn from(error: CircuitBreakerError<GatewayError>) -> Self {
        match error {
            CircuitBreakerError::Open { cooldown_remaining } => Self::CircuitOpen { cooldown_remaining },
            CircuitBreakerError::Inner(inner) => inner,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::AuthenticationFailed(_) => AppError::InvalidCredentials,
            GatewayError::RetriesExhausted {
                attempts,
                last_error,
            } => AppError::RetriesExhausted {
                attempts,
                last_error,
            },
            other => AppError::Gateway(other.to_string()),
        }
    }
}
