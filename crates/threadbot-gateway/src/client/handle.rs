//! Consumer side of a running gateway client

use super::{GatewayError, GatewayHealth, HealthReporter};
use crate::events::DomainEvent;
use crate::queue::SlidingQueue;
use crate::resilience::with_timeout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long [`GatewayHandle::disconnect`] waits for the supervisor before aborting it
pub const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle returned by [`GatewayClient::start`](super::GatewayClient::start)
///
/// Events from every session come out of [`next_event`](Self::next_event) in order.
/// Dropping the handle stops the client.
#[derive(Debug)]
pub struct GatewayHandle {
    queues: watch::Receiver<Arc<SlidingQueue<DomainEvent>>>,
    health: HealthReporter,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<Result<(), GatewayError>>>,
}

impl GatewayHandle {
    pub(crate) fn new(
        queues: watch::Receiver<Arc<SlidingQueue<DomainEvent>>>,
        health: HealthReporter,
        shutdown: watch::Sender<bool>,
        task: JoinHandle<Result<(), GatewayError>>,
    ) -> Self {
        Self {
            queues,
            health,
            shutdown,
            task: Some(task),
        }
    }

    /// Next event, waiting across reconnects
    ///
    /// Returns `None` once the client has stopped and everything queued was consumed.
    pub async fn next_event(&mut self) -> Option<DomainEvent> {
        loop {
            let queue = Arc::clone(&self.queues.borrow_and_update());
            if let Some(event) = queue.take().await {
                return Some(event);
            }

            // The queue was shut down; the supervisor either publishes a fresh one or stops.
            if self.queues.changed().await.is_err() {
                let latest = Arc::clone(&self.queues.borrow());
                if Arc::ptr_eq(&latest, &queue) {
                    return None;
                }
            }
        }
    }

    /// Non-blocking variant of [`next_event`](Self::next_event)
    pub fn try_next_event(&self) -> Option<DomainEvent> {
        self.queues.borrow().try_take()
    }

    /// Events discarded because the consumer fell behind, for the current queue
    pub fn dropped_events(&self) -> u64 {
        self.queues.borrow().dropped()
    }

    pub fn health(&self) -> watch::Receiver<GatewayHealth> {
        self.health.subscribe()
    }

    pub fn health_snapshot(&self) -> GatewayHealth {
        self.health.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.health.snapshot().connected
    }

    /// The supervisor has exited, on its own or after [`disconnect`](Self::disconnect)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the supervisor to exit without asking it to
    ///
    /// Returns the reason the client stopped, e.g. an authentication failure.
    pub async fn stopped(&mut self) -> Result<(), GatewayError> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| GatewayError::Internal(format!("supervisor task failed: {e}")))?,
            None => Ok(()),
        }
    }

    /// Close the current connection with 1000 and stop reconnecting
    pub async fn disconnect(mut self) -> Result<(), GatewayError> {
        self.shutdown.send_replace(true);

        let Some(task) = self.task.take() else {
            return Ok(());
        };
        let abort = task.abort_handle();

        match with_timeout(DISCONNECT_TIMEOUT, task).await {
            Ok(joined) => {
                joined.map_err(|e| GatewayError::Internal(format!("supervisor task failed: {e}")))?
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gateway supervisor did not stop in time, aborting");
                abort.abort();
                Ok(())
            }
        }
    }
}

impl Drop for GatewayHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
