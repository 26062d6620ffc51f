//! Reconnection policy
//!
//! Pure classification of socket closures. No state, no I/O.

mod policy;

pub use policy::{
    can_resume_session, classify, reconnect_delay, should_reconnect, ReconnectDecision,
    DEFAULT_RECONNECT_DELAY, RATE_LIMITED_RECONNECT_DELAY, SESSION_TIMEOUT_RECONNECT_DELAY,
};
