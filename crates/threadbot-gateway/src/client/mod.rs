//! Gateway client
//!
//! Supervises sessions across reconnects and hands events to the consumer through a
//! [`GatewayHandle`].

mod config;
mod error;
mod handle;
mod health;
mod supervisor;

pub use config::ClientConfig;
pub use error::GatewayError;
pub use handle::{GatewayHandle, DISCONNECT_TIMEOUT};
pub use health::{GatewayHealth, HealthReporter};
pub use supervisor::GatewayClient;
