//! Session configuration and per-connection state

use crate::protocol::{GatewayIntents, IdentifyPayload, IdentifyProperties};
use std::fmt;

/// What a session needs to identify itself
#[derive(Clone)]
pub struct SessionConfig {
    pub token: String,
    pub intents: GatewayIntents,
    pub properties: IdentifyProperties,
    /// Close the socket after this many consecutive missed acks; `None` only logs
    pub max_missed_acks: Option<u32>,
}

impl SessionConfig {
    pub fn new(token: impl Into<String>, intents: GatewayIntents) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: IdentifyProperties::default(),
            max_missed_acks: None,
        }
    }

    #[must_use]
    pub fn with_max_missed_acks(mut self, max: Option<u32>) -> Self {
        self.max_missed_acks = max.filter(|n| *n > 0);
        self
    }

    pub(crate) fn identify_payload(&self) -> IdentifyPayload {
        IdentifyPayload {
            token: self.token.clone(),
            intents: self.intents,
            properties: self.properties.clone(),
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("properties", &self.properties)
            .field("max_missed_acks", &self.max_missed_acks)
            .finish()
    }
}

/// Protocol phase of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingHello,
    Identifying,
    Ready,
    Closed,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingHello => "awaiting_hello",
            Self::Identifying => "identifying",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Mutable protocol state shared by frame processing and the heartbeat task
///
/// A fresh value is created for every connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Last dispatch sequence seen
    pub sequence: Option<u64>,
    pub session_id: Option<String>,
    pub heartbeat_interval_ms: Option<u64>,
    pub heartbeat_acknowledged: bool,
    /// Consecutive heartbeats sent without an ack in between
    pub missed_acks: u32,
    pub phase: SessionPhase,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            sequence: None,
            session_id: None,
            heartbeat_interval_ms: None,
            heartbeat_acknowledged: true,
            missed_acks: 0,
            phase: SessionPhase::AwaitingHello,
        }
    }
}

impl SessionState {
    /// Record a dispatch sequence number; the stored value never decreases
    pub fn record_sequence(&mut self, sequence: u64) {
        self.sequence = Some(self.sequence.map_or(sequence, |last| last.max(sequence)));
    }

    pub fn acknowledge_heartbeat(&mut self) {
        self.heartbeat_acknowledged = true;
        self.missed_acks = 0;
    }
}
