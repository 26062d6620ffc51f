//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub discord: DiscordConfig,
    pub gateway: GatewaySettings,
    pub reconnect: ReconnectSettings,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Credentials and endpoints of the remote platform
#[derive(Clone, Deserialize)]
pub struct DiscordConfig {
    /// Raw bot token, sent in Identify and as the REST credential
    pub token: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_gateway_version")]
    pub gateway_version: u8,
    /// Raw gateway intents bitmask
    #[serde(default = "default_intents")]
    pub intents: u64,
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("gateway_version", &self.gateway_version)
            .field("intents", &self.intents)
            .finish()
    }
}

/// Gateway connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// Consecutive missed heartbeat ACKs before the socket is closed (None = log only)
    #[serde(default)]
    pub max_missed_heartbeat_acks: Option<u32>,
}

/// Reconnection and circuit breaker settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Pause before restarting the whole policy after retries are exhausted (0 = give up)
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,
    #[serde(default = "default_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    #[serde(default = "default_breaker_cooldown_secs")]
    pub circuit_breaker_cooldown_secs: u64,
}

// Default value functions
fn default_app_name() -> String {
    "threadbot".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_gateway_version() -> u8 {
    10
}

fn default_intents() -> u64 {
    // GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
    (1 << 0) | (1 << 9) | (1 << 15)
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_event_queue_capacity() -> usize {
    5_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    120_000
}

fn default_restart_delay_secs() -> u64 {
    60
}

fn default_breaker_threshold() -> u32 {
    3
}

fn default_breaker_cooldown_secs() -> u64 {
    30
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let env = match var("APP_ENV") {
            Some(raw) => {
                Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?
            }
            None => default_env(),
        };

        Ok(Self {
            app: AppSettings {
                name: var("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            discord: DiscordConfig {
                token: var("DISCORD_TOKEN").ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?,
                api_base: var("DISCORD_API_BASE")
                    .map(|s| s.trim_end_matches('/').to_string())
                    .unwrap_or_else(default_api_base),
                gateway_version: parse_or(&var, "GATEWAY_VERSION", default_gateway_version)?,
                intents: parse_or(&var, "GATEWAY_INTENTS", default_intents)?,
            },
            gateway: GatewaySettings {
                connect_timeout_secs: parse_or(
                    &var,
                    "CONNECT_TIMEOUT_SECS",
                    default_connect_timeout_secs,
                )?,
                event_queue_capacity: parse_or(
                    &var,
                    "EVENT_QUEUE_CAPACITY",
                    default_event_queue_capacity,
                )?,
                max_missed_heartbeat_acks: match var("HEARTBEAT_MAX_MISSED_ACKS") {
                    Some(raw) => Some(parse_value("HEARTBEAT_MAX_MISSED_ACKS", raw)?),
                    None => None,
                },
            },
            reconnect: ReconnectSettings {
                max_attempts: parse_or(&var, "RECONNECT_MAX_ATTEMPTS", default_max_attempts)?,
                base_delay_ms: parse_or(&var, "RECONNECT_BASE_DELAY_MS", default_base_delay_ms)?,
                max_delay_ms: parse_or(&var, "RECONNECT_MAX_DELAY_MS", default_max_delay_ms)?,
                restart_delay_secs: parse_or(
                    &var,
                    "RECONNECT_RESTART_DELAY_SECS",
                    default_restart_delay_secs,
                )?,
                circuit_breaker_threshold: parse_or(
                    &var,
                    "CIRCUIT_BREAKER_THRESHOLD",
                    default_breaker_threshold,
                )?,
                circuit_breaker_cooldown_secs: parse_or(
                    &var,
                    "CIRCUIT_BREAKER_COOLDOWN_SECS",
                    default_breaker_cooldown_secs,
                )?,
            },
        })
    }
}

fn parse_or<T, V, D>(var: &V, name: &'static str, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    V: Fn(&'static str) -> Option<String>,
    D: FnOnce() -> T,
{
    match var(name) {
        Some(raw) => parse_value(name, raw),
        None => Ok(default()),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name, raw))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
