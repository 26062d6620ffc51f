//! Connection lifecycle state and inbound frames

use std::fmt;

/// Lifecycle state of one physical socket
///
/// Transitions only move forward: `Connecting -> Connected -> Disconnected | Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Handshake in progress
    Connecting,
    /// Socket open, frames flowing
    Connected,
    /// Closed with a close code (remote, local, or 1006 when the peer vanished)
    Disconnected { code: u16, reason: String },
    /// Socket errored out
    Failed { cause: String },
}

impl ConnectionState {
    /// Whether this is the final state of the connection
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected { .. } | Self::Failed { .. })
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Close code of a terminal state; failures count as abnormal closure
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match self {
            Self::Disconnected { code, .. } => Some(*code),
            Self::Failed { .. } => Some(1006),
            Self::Connecting | Self::Connected => None,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Disconnected { code, reason } if reason.is_empty() => {
                write!(f, "disconnected ({code})")
            }
            Self::Disconnected { code, reason } => write!(f, "disconnected ({code}: {reason})"),
            Self::Failed { cause } => write!(f, "failed ({cause})"),
        }
    }
}

/// A data frame received from the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Binary(Vec<u8>),
}

impl InboundFrame {
    /// Payload size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
