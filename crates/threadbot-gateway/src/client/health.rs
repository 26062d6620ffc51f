//! Process-wide gateway health
//!
//! Owned by the supervisor and published through a `watch` channel. The session reports
//! READY and heartbeat acks through a [`HealthReporter`].

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of the gateway's health
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayHealth {
    /// READY received or heartbeat acked on the current connection
    pub connected: bool,
    pub session_id: Option<String>,
    pub last_heartbeat_ack: Option<DateTime<Utc>>,
    /// Consecutive failed connection attempts in the current run
    pub reconnect_attempts: u32,
    pub last_close_code: Option<u16>,
    /// The client has stopped and will not reconnect
    pub stopped: bool,
}

/// Write side of the health channel
#[derive(Debug, Clone)]
pub struct HealthReporter {
    tx: Arc<watch::Sender<GatewayHealth>>,
}

impl HealthReporter {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GatewayHealth::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<GatewayHealth> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> GatewayHealth {
        self.tx.borrow().clone()
    }

    pub fn mark_ready(&self, session_id: &str) {
        self.tx.send_modify(|health| {
            health.connected = true;
            health.session_id = Some(session_id.to_string());
            health.reconnect_attempts = 0;
        });
    }

    pub fn mark_heartbeat_ack(&self) {
        self.tx.send_modify(|health| {
            health.connected = true;
            health.last_heartbeat_ack = Some(Utc::now());
        });
    }

    pub fn mark_disconnected(&self, code: u16) {
        self.tx.send_modify(|health| {
            health.connected = false;
            health.session_id = None;
            health.last_close_code = Some(code);
        });
    }

    pub fn set_reconnect_attempts(&self, attempts: u32) {
        self.tx.send_modify(|health| health.reconnect_attempts = attempts);
    }

    pub fn mark_stopped(&self) {
        self.tx.send_modify(|health| {
            health.connected = false;
            health.stopped = true;
        });
    }
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new()
    }
}
