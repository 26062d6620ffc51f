//! Gateway intents bitflags
//!
//! Intents select which dispatch groups the gateway sends to this connection.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Gateway intent flags requested in Identify
    ///
    /// Serialized as a plain JSON integer.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GatewayIntents: u64 {
        /// Guild create/update/delete, channel and thread events
        const GUILDS                   = 1 << 0;
        /// Member add/update/remove (privileged)
        const GUILD_MEMBERS            = 1 << 1;
        /// Bans and audit log entries
        const GUILD_MODERATION         = 1 << 2;
        /// Webhook updates
        const GUILD_WEBHOOKS           = 1 << 5;
        /// Presence updates (privileged)
        const GUILD_PRESENCES          = 1 << 8;
        /// Messages sent in guild channels
        const GUILD_MESSAGES           = 1 << 9;
        /// Reactions in guild channels
        const GUILD_MESSAGE_REACTIONS  = 1 << 10;
        /// Direct messages
        const DIRECT_MESSAGES          = 1 << 12;
        /// Message content in message events (privileged)
        const MESSAGE_CONTENT          = 1 << 15;

        /// What a thread-creating message bot needs
        const MESSAGE_BOT = Self::GUILDS.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::MESSAGE_CONTENT.bits();
    }
}

impl GatewayIntents {
    /// Intents that must be enabled in the application settings before use
    pub const PRIVILEGED: Self = Self::GUILD_MEMBERS
        .union(Self::GUILD_PRESENCES)
        .union(Self::MESSAGE_CONTENT);

    /// Create from raw bits, dropping unknown flags
    #[inline]
    pub fn from_raw(bits: u64) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// Check whether any privileged intent is requested
    #[inline]
    pub fn is_privileged(&self) -> bool {
        self.intersects(Self::PRIVILEGED)
    }
}

impl Default for GatewayIntents {
    fn default() -> Self {
        Self::MESSAGE_BOT
    }
}

impl fmt::Display for GatewayIntents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

impl Serialize for GatewayIntents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for GatewayIntents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}
