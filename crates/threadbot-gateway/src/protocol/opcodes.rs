//! Gateway op codes
//!
//! Serialized as bare integers in the `op` field of every frame.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum OpCode {
    /// Event dispatch; carries `t` and `s`
    Dispatch = 0,
    /// Heartbeat, in either direction
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    VoiceStateUpdate = 4,
    /// Never sent: sessions are always re-identified
    Resume = 6,
    /// Server asks the client to reconnect
    Reconnect = 7,
    RequestGuildMembers = 8,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
}

const ALL: [OpCode; 11] = [
    OpCode::Dispatch,
    OpCode::Heartbeat,
    OpCode::Identify,
    OpCode::PresenceUpdate,
    OpCode::VoiceStateUpdate,
    OpCode::Resume,
    OpCode::Reconnect,
    OpCode::RequestGuildMembers,
    OpCode::InvalidSession,
    OpCode::Hello,
    OpCode::HeartbeatAck,
];

impl OpCode {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        ALL.into_iter().find(|op| op.as_u8() == value)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for OpCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or_else(|| format!("unknown op code {value}"))
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op.as_u8()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", self.as_u8())
    }
}
