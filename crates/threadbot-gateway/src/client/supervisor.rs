//! Connection supervisor
//!
//! Owns the reconnect loop: discover, connect through the backoff schedule and circuit
//! breaker, run a session, then ask the reconnection policy what to do with its close code.

use super::{ClientConfig, GatewayError, GatewayHandle, HealthReporter};
use crate::connection::Connection;
use crate::discovery::GatewayDiscovery;
use crate::events::DomainEvent;
use crate::protocol::CloseCode;
use crate::queue::SlidingQueue;
use crate::reconnect::{classify, ReconnectDecision};
use crate::resilience::{retry_with_backoff_if, CircuitBreaker};
use crate::session::{GatewaySession, SessionConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Gateway client; [`GatewayClient::start`] spawns the supervisor
#[derive(Debug)]
pub struct GatewayClient {
    config: ClientConfig,
}

impl GatewayClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Spawn the supervisor and return the consumer handle
    ///
    /// Dropping the handle stops the client.
    pub fn start(self) -> GatewayHandle {
        let health = HealthReporter::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let first_queue = Arc::new(SlidingQueue::new(self.config.event_queue_capacity));
        let (queue_tx, queue_rx) = watch::channel(Arc::clone(&first_queue));

        let supervisor = Supervisor {
            discovery: GatewayDiscovery::new(self.config.discovery.clone()),
            breaker: CircuitBreaker::new("gateway-connect", self.config.circuit_breaker.clone()),
            session_config: Arc::new(self.config.session.clone()),
            config: self.config,
            health: health.clone(),
            queues: queue_tx,
            shutdown: shutdown_rx,
        };

        let task = tokio::spawn(supervisor.run());
        GatewayHandle::new(queue_rx, health, shutdown_tx, task)
    }
}

struct Supervisor {
    config: ClientConfig,
    session_config: Arc<SessionConfig>,
    discovery: GatewayDiscovery,
    breaker: CircuitBreaker,
    health: HealthReporter,
    queues: watch::Sender<Arc<SlidingQueue<DomainEvent>>>,
    shutdown: watch::Receiver<bool>,
}

impl Supervisor {
    async fn run(self) -> Result<(), GatewayError> {
        tracing::info!("Gateway client starting");
        let result = self.supervise().await;

        self.queues.borrow().shutdown();
        self.health.mark_stopped();
        match &result {
            Ok(()) => tracing::info!("Gateway client stopped"),
            Err(e) => tracing::error!(error = %e, "Gateway client stopped"),
        }
        result
    }

    async fn supervise(&self) -> Result<(), GatewayError> {
        loop {
            if self.is_shutting_down() {
                return Ok(());
            }

            let connection = match self.connect_with_retry().await {
                Ok(connection) => connection,
                Err(GatewayError::Stopped) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(error = %e, "Could not reach the gateway");
                    let Some(delay) = self.config.restart_delay else {
                        return Err(e);
                    };
                    tracing::info!(delay_secs = delay.as_secs(), "Restarting connection attempts after pause");
                    if self.sleep_or_shutdown(delay).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            let queue = self.next_queue();
            let session = GatewaySession::new(
                connection,
                Arc::clone(&self.session_config),
                queue,
                self.health.clone(),
            );
            let outcome = session.run(self.shutdown.clone()).await;
            self.health.mark_disconnected(outcome.code);

            if self.is_shutting_down() {
                return Ok(());
            }

            match classify(outcome.code) {
                ReconnectDecision::Fatal => {
                    tracing::error!(
                        code = outcome.code,
                        reason = %outcome.reason,
                        "Gateway rejected authentication, not reconnecting"
                    );
                    return Err(GatewayError::AuthenticationFailed(CloseCode::describe(
                        outcome.code,
                    )));
                }
                ReconnectDecision::Reconnect { delay, resumable } => {
                    tracing::info!(
                        code = outcome.code,
                        reason = %outcome.reason,
                        close = %CloseCode::describe(outcome.code),
                        resumable,
                        delay_ms = delay.as_millis(),
                        "Reconnecting to gateway"
                    );
                    if self.sleep_or_shutdown(delay).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Open a connection through the backoff schedule and the circuit breaker
    async fn connect_with_retry(&self) -> Result<Connection, GatewayError> {
        let attempts = retry_with_backoff_if(
            &self.config.backoff,
            GatewayError::is_retryable,
            |attempt| async move {
                self.health.set_reconnect_attempts(attempt - 1);
                tracing::debug!(attempt, "Connecting to gateway");
                self.breaker
                    .call(|| self.connect_once())
                    .await
                    .map_err(GatewayError::from)
            },
        );

        let mut shutdown = self.shutdown.clone();
        let result = tokio::select! {
            result = attempts => result,
            () = shutdown_requested(&mut shutdown) => return Err(GatewayError::Stopped),
        };

        result.map_err(|e| {
            if e.is_retryable() {
                GatewayError::RetriesExhausted {
                    attempts: self.config.backoff.max_attempts.max(1),
                    last_error: e.to_string(),
                }
            } else {
                e
            }
        })
    }

    async fn connect_once(&self) -> Result<Connection, GatewayError> {
        let url = match &self.config.gateway_url {
            Some(url) => url.clone(),
            None => self.discovery.discover().await?,
        };
        Ok(Connection::connect(&url, self.config.connect_timeout).await?)
    }

    /// Queue for the next session: the current one unless a session already shut it down
    fn next_queue(&self) -> Arc<SlidingQueue<DomainEvent>> {
        let current = Arc::clone(&self.queues.borrow());
        if !current.is_closed() {
            return current;
        }
        let queue = Arc::new(SlidingQueue::new(self.config.event_queue_capacity));
        self.queues.send_replace(Arc::clone(&queue));
        queue
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }

    /// Sleep for `delay`; returns `true` if shutdown was requested meanwhile
    async fn sleep_or_shutdown(&self, delay: Duration) -> bool {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            () = tokio::time::sleep(delay) => self.is_shutting_down(),
            () = shutdown_requested(&mut shutdown) => true,
        }
    }
}

/// Resolves once shutdown is requested or the handle is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
