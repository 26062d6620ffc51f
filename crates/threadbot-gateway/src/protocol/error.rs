//! Protocol error types

use super::OpCode;
use thiserror::Error;

/// Errors raised while encoding or decoding gateway frames
///
/// None of these terminate a session: the offending frame is skipped.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame is not a valid gateway envelope
    #[error("Malformed gateway frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// Envelope is valid but the op code is not one this client knows
    #[error("Unknown op code: {0}")]
    UnknownOpcode(u64),

    /// Envelope is valid but `d` does not match the expected schema
    #[error("Invalid payload for {op} (event {event:?}): {source}")]
    Payload {
        op: OpCode,
        event: Option<String>,
        #[source]
        source: serde_json::Error,
    },

    /// Outbound payload could not be serialized
    #[error("Failed to encode outbound frame: {0}")]
    Encode(#[source] serde_json::Error),

    /// Binary frames are not part of the JSON encoding
    #[error("Unexpected binary frame ({0} bytes)")]
    UnexpectedBinary(usize),
}

impl ProtocolError {
    /// Whether the frame was well-formed but simply not understood
    #[must_use]
    pub fn is_unknown_opcode(&self) -> bool {
        matches!(self, Self::UnknownOpcode(_))
    }
}
