//! Heartbeat task
//!
//! Runs on its own timer, independent of frame processing. The payload is built under the
//! session lock so it carries the latest recorded sequence; the socket write happens after
//! the lock is released.

use super::SessionState;
use crate::connection::ConnectionSender;
use crate::protocol::GatewayMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Close code used when acks stop arriving
pub const HEARTBEAT_TIMEOUT_CLOSE_CODE: u16 = 1001;

/// Start sending heartbeats every `interval`, first one after a full interval
pub(crate) fn spawn_heartbeat(
    sender: ConnectionSender,
    state: Arc<Mutex<SessionState>>,
    interval: Duration,
    max_missed_acks: Option<u32>,
) -> JoinHandle<()> {
    let connection_id = sender.connection_id();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let (payload, sequence) = {
                let mut state = state.lock().await;

                if !state.heartbeat_acknowledged {
                    state.missed_acks += 1;
                    tracing::warn!(
                        connection_id = %connection_id,
                        missed = state.missed_acks,
                        "Previous heartbeat was not acknowledged"
                    );

                    if max_missed_acks.is_some_and(|max| state.missed_acks >= max) {
                        tracing::warn!(
                            connection_id = %connection_id,
                            missed = state.missed_acks,
                            "Too many missed heartbeat acks, closing connection"
                        );
                        drop(state);
                        sender
                            .close(HEARTBEAT_TIMEOUT_CLOSE_CODE, "heartbeat ack timeout")
                            .await;
                        return;
                    }
                }

                let payload = match GatewayMessage::heartbeat(state.sequence).to_json() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!(connection_id = %connection_id, error = %e, "Failed to encode heartbeat");
                        continue;
                    }
                };
                // Cleared before the write so an ack racing the send is not lost.
                state.heartbeat_acknowledged = false;
                (payload, state.sequence)
            };

            if let Err(e) = sender.send(payload).await {
                tracing::debug!(connection_id = %connection_id, error = %e, "Heartbeat stopped");
                return;
            }
            tracing::trace!(connection_id = %connection_id, seq = ?sequence, "Heartbeat sent");
        }
    })
}
