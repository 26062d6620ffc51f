//! Gateway payload definitions
//!
//! Payloads received in Hello and sent in Identify / Heartbeat.

use super::GatewayIntents;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
///
/// Sent by the client once per connection, right after Hello.
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Raw bot token
    pub token: String,

    /// Requested gateway intents
    pub intents: GatewayIntents,

    /// Client connection properties
    pub properties: IdentifyProperties,
}

impl IdentifyPayload {
    #[must_use]
    pub fn new(token: impl Into<String>, intents: GatewayIntents) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: IdentifyProperties::default(),
        }
    }
}

impl std::fmt::Debug for IdentifyPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifyPayload")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("properties", &self.properties)
            .finish()
    }
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    pub os: String,

    /// Library name
    pub browser: String,

    /// Device name
    pub device: String,
}

impl IdentifyProperties {
    /// Library name reported to the platform
    pub const LIBRARY: &'static str = "threadbot";
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: Self::LIBRARY.to_string(),
            device: Self::LIBRARY.to_string(),
        }
    }
}

/// `d` field of a READY dispatch
///
/// Only the fields the client needs; everything else stays in the raw dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyPayload {
    /// Gateway protocol version
    pub v: u8,

    /// Session ID (required for a future resume)
    pub session_id: String,

    /// Gateway URL to use when resuming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,
}
