//! WebSocket close codes
//!
//! RFC 6455 codes the client reports itself plus the gateway's 4xxx range. Closures are
//! passed around as raw `u16`; [`CloseCode`] names the ones with a defined meaning.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    Normal = 1000,
    GoingAway = 1001,
    /// No close frame was received (peer vanished)
    Abnormal = 1006,
    UnknownError = 4000,
    UnknownOpcode = 4001,
    DecodeError = 4002,
    /// Payload sent before Identify
    NotAuthenticated = 4003,
    /// Token rejected; the only closure the client never recovers from
    AuthenticationFailed = 4004,
    AlreadyAuthenticated = 4005,
    InvalidSequence = 4007,
    RateLimited = 4008,
    SessionTimeout = 4009,
    InvalidShard = 4010,
    ShardingRequired = 4011,
    InvalidApiVersion = 4012,
    InvalidIntents = 4013,
    DisallowedIntents = 4014,
}

const KNOWN: [(CloseCode, &str); 17] = [
    (CloseCode::Normal, "normal closure"),
    (CloseCode::GoingAway, "going away"),
    (CloseCode::Abnormal, "connection lost without a close frame"),
    (CloseCode::UnknownError, "unknown error"),
    (CloseCode::UnknownOpcode, "unknown opcode"),
    (CloseCode::DecodeError, "payload could not be decoded"),
    (CloseCode::NotAuthenticated, "payload sent before identifying"),
    (CloseCode::AuthenticationFailed, "authentication failed"),
    (CloseCode::AlreadyAuthenticated, "identified more than once"),
    (CloseCode::InvalidSequence, "invalid resume sequence"),
    (CloseCode::RateLimited, "sending too fast"),
    (CloseCode::SessionTimeout, "session timed out"),
    (CloseCode::InvalidShard, "invalid shard"),
    (CloseCode::ShardingRequired, "sharding required"),
    (CloseCode::InvalidApiVersion, "invalid gateway version"),
    (CloseCode::InvalidIntents, "invalid intents"),
    (CloseCode::DisallowedIntents, "intents not enabled for this application"),
];

impl CloseCode {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        KNOWN
            .iter()
            .find(|(code, _)| code.as_u16() == value)
            .map(|(code, _)| *code)
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        KNOWN
            .iter()
            .find(|(code, _)| *code == self)
            .map_or("unknown", |(_, text)| *text)
    }

    /// Log label for a raw code, known or not
    #[must_use]
    pub fn describe(code: u16) -> String {
        Self::from_u16(code).map_or_else(|| format!("{code} (unrecognized)"), |known| known.to_string())
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {self:?}: {}", self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl TryFrom<u16> for CloseCode {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_u16(value).ok_or(value)
    }
}
