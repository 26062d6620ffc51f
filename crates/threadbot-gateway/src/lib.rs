//! # threadbot-gateway
//!
//! Resilient client for the Discord gateway. Discovers the socket URL, performs the
//! Hello/Identify handshake, keeps the heartbeat going and reconnects according to the
//! close code, publishing decoded events to a bounded queue.
//!
//! ```no_run
//! use threadbot_gateway::{ClientConfig, GatewayClient};
//!
//! # async fn demo() -> Result<(), threadbot_gateway::GatewayError> {
//! let config = ClientConfig::new("bot-token", "https://discord.com/api/v10");
//! let mut handle = GatewayClient::new(config).start();
//! while let Some(event) = handle.next_event().await {
//!     println!("{}", event.event_name());
//! }
//! handle.disconnect().await
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod discovery;
pub mod events;
pub mod protocol;
pub mod queue;
pub mod reconnect;
pub mod resilience;
pub mod session;

pub use client::{ClientConfig, GatewayClient, GatewayError, GatewayHandle, GatewayHealth};
pub use events::DomainEvent;
