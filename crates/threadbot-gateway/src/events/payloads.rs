//! Event payload definitions
//!
//! Typed views over the `d` field of the dispatches consumers care about.
//! Unknown fields are ignored so platform additions never break decoding.

use super::Snowflake;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// === User Payload ===

/// User data included in events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

impl UserPayload {
    /// Name to show for this user
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.global_name.as_deref().unwrap_or(&self.username)
    }
}

// === Message Events ===

/// MESSAGE_CREATE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCreateEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub author: UserPayload,
    /// Empty unless the MESSAGE_CONTENT intent is granted
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
    /// Message type (0 = default, 19 = reply, ...)
    #[serde(rename = "type", default)]
    pub kind: u8,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
    #[serde(default)]
    pub mentions: Vec<UserPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReferencePayload>,
}

impl MessageCreateEvent {
    /// Whether the author is a bot account (including this one)
    #[must_use]
    pub fn is_from_bot(&self) -> bool {
        self.author.bot
    }

    /// Whether the message was sent in a guild rather than a DM
    #[must_use]
    pub fn in_guild(&self) -> bool {
        self.guild_id.is_some()
    }
}

/// Attachment data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentPayload {
    pub id: Snowflake,
    pub filename: String,
    pub size: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Message reference for replies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReferencePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

// === Interaction Events ===

/// Interaction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Ping,
    ApplicationCommand,
    MessageComponent,
    Autocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl From<u8> for InteractionKind {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::Autocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

/// Guild member wrapper sent with guild interactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionMember {
    pub user: UserPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
}

/// INTERACTION_CREATE event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionCreateEvent {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: u8,
    /// Command name/options or component data, left untyped for the command layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// Present for guild interactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<InteractionMember>,
    /// Present for DM interactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserPayload>,
    /// Continuation token for responding
    pub token: String,
    #[serde(default)]
    pub version: u8,
}

impl InteractionCreateEvent {
    #[must_use]
    pub fn interaction_kind(&self) -> InteractionKind {
        InteractionKind::from(self.kind)
    }

    /// The user who triggered the interaction, in guilds or DMs
    #[must_use]
    pub fn invoking_user(&self) -> Option<&UserPayload> {
        self.member
            .as_ref()
            .map(|m| &m.user)
            .or(self.user.as_ref())
    }

    /// Slash command name, if this is an application command
    #[must_use]
    pub fn command_name(&self) -> Option<&str> {
        if self.interaction_kind() != InteractionKind::ApplicationCommand {
            return None;
        }
        self.data.as_ref()?.get("name")?.as_str()
    }
}
