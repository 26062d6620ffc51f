//! Gateway events
//!
//! Dispatch names, typed payloads and the domain events published to consumers.

mod domain;
mod event_types;
mod payloads;
mod snowflake;

pub use domain::{DispatchEvent, DomainEvent};
pub use event_types::GatewayEventType;
pub use payloads::{
    AttachmentPayload, InteractionCreateEvent, InteractionKind, InteractionMember,
    MessageCreateEvent, MessageReferencePayload, UserPayload,
};
pub use snowflake::{Snowflake, SnowflakeParseError};
