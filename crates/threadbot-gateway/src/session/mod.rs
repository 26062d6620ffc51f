//! Gateway session
//!
//! The protocol state machine: handshake, heartbeat, sequencing and event decoding for
//! one physical connection.

mod gateway;
mod heartbeat;
mod state;

pub use gateway::{GatewaySession, SessionOutcome};
pub use heartbeat::HEARTBEAT_TIMEOUT_CLOSE_CODE;
pub use state::{SessionConfig, SessionPhase, SessionState};
