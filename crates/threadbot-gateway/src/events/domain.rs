//! Domain events handed to consumers

use super::{GatewayEventType, InteractionCreateEvent, MessageCreateEvent};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Generic envelope for any dispatch received on the gateway
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub event_type: String,
    pub sequence: Option<u64>,
    pub data: Value,
    pub received_at: DateTime<Utc>,
}

impl DispatchEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, sequence: Option<u64>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            sequence,
            data,
            received_at: Utc::now(),
        }
    }

    /// Known event type, if the name is one this client recognises
    #[must_use]
    pub fn known_type(&self) -> Option<GatewayEventType> {
        GatewayEventType::from_str(&self.event_type)
    }
}

/// Events published on the event queue
///
/// A typed `MessageCreate` or `InteractionCreate` is always followed by the
/// `Dispatch` envelope of the same frame.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    Dispatch(DispatchEvent),
    MessageCreate {
        sequence: Option<u64>,
        message: Box<MessageCreateEvent>,
    },
    InteractionCreate {
        sequence: Option<u64>,
        interaction: Box<InteractionCreateEvent>,
    },
}

impl DomainEvent {
    /// Sequence number of the dispatch this event came from
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Self::Dispatch(event) => event.sequence,
            Self::MessageCreate { sequence, .. } | Self::InteractionCreate { sequence, .. } => {
                *sequence
            }
        }
    }

    /// Dispatch name this event was decoded from
    #[must_use]
    pub fn event_name(&self) -> &str {
        match self {
            Self::Dispatch(event) => &event.event_type,
            Self::MessageCreate { .. } => GatewayEventType::MessageCreate.as_str(),
            Self::InteractionCreate { .. } => GatewayEventType::InteractionCreate.as_str(),
        }
    }

    #[must_use]
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}
