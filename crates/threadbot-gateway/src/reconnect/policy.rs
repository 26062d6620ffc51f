//! Close-code classification

use crate::protocol::CloseCode;
use std::time::Duration;

/// Delay before reconnecting after most closures
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Delay after the gateway closed us for sending too fast (4008)
pub const RATE_LIMITED_RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// Delay after the session timed out or was invalidated (4009)
pub const SESSION_TIMEOUT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Whether a closure with `code` should be followed by a reconnect
///
/// Only an authentication failure (4004) is final.
#[must_use]
pub fn should_reconnect(code: u16) -> bool {
    code != CloseCode::AuthenticationFailed.as_u16()
}

/// How long to wait before reconnecting after a closure with `code`
#[must_use]
pub fn reconnect_delay(code: u16) -> Duration {
    match CloseCode::from_u16(code) {
        Some(CloseCode::RateLimited) => RATE_LIMITED_RECONNECT_DELAY,
        Some(CloseCode::SessionTimeout) => SESSION_TIMEOUT_RECONNECT_DELAY,
        _ => DEFAULT_RECONNECT_DELAY,
    }
}

/// Whether the session could be resumed after a closure with `code`
///
/// Classification only: the client always starts a fresh session.
#[must_use]
pub fn can_resume_session(code: u16) -> bool {
    !matches!(
        CloseCode::from_u16(code),
        Some(
            CloseCode::NotAuthenticated
                | CloseCode::InvalidSequence
                | CloseCode::SessionTimeout
                | CloseCode::InvalidShard
                | CloseCode::ShardingRequired
                | CloseCode::InvalidApiVersion
                | CloseCode::DisallowedIntents
        )
    )
}

/// Combined verdict for one closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait `delay`, then open a new session
    Reconnect { delay: Duration, resumable: bool },
    /// Stop for good
    Fatal,
}

#[must_use]
pub fn classify(code: u16) -> ReconnectDecision {
    if should_reconnect(code) {
        ReconnectDecision::Reconnect {
            delay: reconnect_delay(code),
            resumable: can_resume_session(code),
        }
    } else {
        ReconnectDecision::Fatal
    }
}
