//! Gateway client configuration

use crate::connection::DEFAULT_CONNECT_TIMEOUT;
use crate::discovery::DiscoveryConfig;
use crate::protocol::GatewayIntents;
use crate::queue::DEFAULT_EVENT_QUEUE_CAPACITY;
use crate::resilience::{BackoffConfig, CircuitBreakerConfig};
use crate::session::SessionConfig;
use std::time::Duration;
use threadbot_common::AppConfig;

/// Everything the supervisor needs to run
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub session: SessionConfig,
    pub discovery: DiscoveryConfig,
    /// Connect here directly instead of asking `/gateway/bot`
    pub gateway_url: Option<String>,
    pub connect_timeout: Duration,
    pub event_queue_capacity: usize,
    pub backoff: BackoffConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Pause before starting over once the backoff is exhausted; `None` stops the client
    pub restart_delay: Option<Duration>,
}

impl ClientConfig {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            session: SessionConfig::new(token.clone(), GatewayIntents::default()),
            discovery: DiscoveryConfig::new(api_base, token),
            gateway_url: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            backoff: BackoffConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            restart_delay: Some(Duration::from_secs(60)),
        }
    }

    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_intents(mut self, intents: GatewayIntents) -> Self {
        self.session.intents = intents;
        self
    }
}

impl From<&AppConfig> for ClientConfig {
    fn from(config: &AppConfig) -> Self {
        let discord = &config.discord;
        let gateway = &config.gateway;
        let reconnect = &config.reconnect;

        let mut discovery = DiscoveryConfig::new(&discord.api_base, &discord.token);
        discovery.version = discord.gateway_version;

        Self {
            session: SessionConfig::new(&discord.token, GatewayIntents::from_raw(discord.intents))
                .with_max_missed_acks(gateway.max_missed_heartbeat_acks),
            discovery,
            gateway_url: None,
            connect_timeout: Duration::from_secs(gateway.connect_timeout_secs),
            event_queue_capacity: gateway.event_queue_capacity,
            backoff: BackoffConfig {
                max_attempts: reconnect.max_attempts,
                base_delay: Duration::from_millis(reconnect.base_delay_ms),
                max_delay: Duration::from_millis(reconnect.max_delay_ms),
                ..BackoffConfig::default()
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: reconnect.circuit_breaker_threshold,
                cooldown: Duration::from_secs(reconnect.circuit_breaker_cooldown_secs),
            },
            restart_delay: (reconnect.restart_delay_secs > 0)
                .then(|| Duration::from_secs(reconnect.restart_delay_secs)),
        }
    }
}
