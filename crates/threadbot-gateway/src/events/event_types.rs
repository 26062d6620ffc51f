//! Dispatch event names the client decodes itself
//!
//! Anything else still reaches consumers as a generic dispatch.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    Ready,
    Resumed,
    GuildCreate,
    GuildDelete,
    ThreadCreate,
    MessageCreate,
    MessageUpdate,
    MessageDelete,
    /// Slash command, component or modal submission
    InteractionCreate,
}

const NAMES: [(GatewayEventType, &str); 9] = [
    (GatewayEventType::Ready, "READY"),
    (GatewayEventType::Resumed, "RESUMED"),
    (GatewayEventType::GuildCreate, "GUILD_CREATE"),
    (GatewayEventType::GuildDelete, "GUILD_DELETE"),
    (GatewayEventType::ThreadCreate, "THREAD_CREATE"),
    (GatewayEventType::MessageCreate, "MESSAGE_CREATE"),
    (GatewayEventType::MessageUpdate, "MESSAGE_UPDATE"),
    (GatewayEventType::MessageDelete, "MESSAGE_DELETE"),
    (GatewayEventType::InteractionCreate, "INTERACTION_CREATE"),
];

impl GatewayEventType {
    /// Name as it appears in the `t` field
    #[must_use]
    pub fn as_str(self) -> &'static str {
        NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or("", |(_, name)| *name)
    }

    #[must_use]
    pub fn from_str(name: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(_, known)| *known == name)
            .map(|(kind, _)| *kind)
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
