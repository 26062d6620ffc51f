//! Gateway protocol definitions
//!
//! Defines the WebSocket protocol including op codes, message formats, intents and close codes.

mod close_codes;
mod error;
mod intents;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use error::ProtocolError;
pub use intents::GatewayIntents;
pub use messages::GatewayMessage;
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, IdentifyPayload, IdentifyProperties, ReadyPayload};
