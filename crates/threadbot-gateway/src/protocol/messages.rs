//! Gateway message format
//!
//! Defines the JSON envelope shared by every gateway frame.

use super::{HelloPayload, IdentifyPayload, OpCode, ProtocolError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message format
///
/// All messages sent over the WebSocket connection follow this format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event type (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(default)]
    pub d: Option<Value>,
}

/// Envelope with the op code left raw so unknown codes can be told apart from garbage
#[derive(Deserialize)]
struct RawEnvelope {
    op: u64,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    d: Option<Value>,
}

impl GatewayMessage {
    // === Client Messages ===

    /// Create an Identify message (op=2)
    pub fn identify(payload: &IdentifyPayload) -> Result<Self, ProtocolError> {
        Ok(Self {
            op: OpCode::Identify,
            t: None,
            s: None,
            d: Some(serde_json::to_value(payload).map_err(ProtocolError::Encode)?),
        })
    }

    /// Create a Heartbeat message (op=1)
    ///
    /// `d` is always present; it is `null` until the first dispatch sequence is seen.
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self {
            op: OpCode::Heartbeat,
            t: None,
            s: None,
            d: Some(last_sequence.map_or(Value::Null, |s| Value::Number(s.into()))),
        }
    }

    // === Parsing ===

    /// Decode a text frame into a gateway message
    ///
    /// Distinguishes malformed JSON from well-formed frames carrying an op code this
    /// client does not know.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope = serde_json::from_str(text)?;
        let op = u8::try_from(raw.op)
            .ok()
            .and_then(OpCode::from_u8)
            .ok_or(ProtocolError::UnknownOpcode(raw.op))?;

        Ok(Self {
            op,
            t: raw.t,
            s: raw.s,
            d: raw.d,
        })
    }

    /// Decode the `d` field into a typed payload
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let data = self.d.clone().unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|source| ProtocolError::Payload {
            op: self.op,
            event: self.t.clone(),
            source,
        })
    }

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        self.data().ok()
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
