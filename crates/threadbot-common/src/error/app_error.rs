//! Application error types
//!
//! Unified error handling for the bot process.

use crate::config::ConfigError;
use serde::Serialize;
use std::fmt;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid bot credential")]
    InvalidCredentials,

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    // External service errors
    #[error("External service error: {0}")]
    ExternalService(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),

    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    /// Process exit code for this error
    ///
    /// Credential problems get their own code so supervisors can page an operator
    /// instead of restart-looping.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidCredentials => 2,
            Self::Config(_) => 78,
            Self::Gateway(_)
            | Self::RateLimited { .. }
            | Self::RetriesExhausted { .. }
            | Self::ExternalService(_)
            | Self::Internal(_) => 1,
        }
    }

    /// Get error code for structured logs
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Check if retrying the failed operation may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway(_) | Self::RateLimited { .. } | Self::ExternalService(_)
        )
    }

    /// Check if this error requires operator attention
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidCredentials | Self::Config(_))
    }

    /// Create a gateway error
    #[must_use]
    pub fn gateway(msg: impl fmt::Display) -> Self {
        Self::Gateway(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Serializable error summary for structured output
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let details = match err {
            AppError::RateLimited { retry_after_secs } => {
                Some(serde_json::json!({ "retry_after": retry_after_secs }))
            }
            AppError::RetriesExhausted { attempts, .. } => {
                Some(serde_json::json!({ "attempts": attempts }))
            }
            _ => None,
        };

        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        Self::from(&err)
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
