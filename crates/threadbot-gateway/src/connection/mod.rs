//! Connection transport
//!
//! Owns one physical WebSocket and exposes send/receive/state primitives. No protocol
//! knowledge lives here.

mod error;
mod state;
mod transport;

pub use error::TransportError;
pub use state::{ConnectionState, InboundFrame};
pub use transport::{Connection, ConnectionSender, CLOSE_GRACE, DEFAULT_CONNECT_TIMEOUT};
