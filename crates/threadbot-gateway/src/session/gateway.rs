//! Gateway protocol state machine
//!
//! `AwaitingHello -> Identifying -> Ready -> Closed`, one instance per physical connection.
//! Frames are processed strictly in arrival order; a frame that fails to decode is logged
//! and skipped, never fatal.

use super::heartbeat::spawn_heartbeat;
use super::{SessionConfig, SessionPhase, SessionState};
use crate::client::HealthReporter;
use crate::connection::{Connection, ConnectionState, InboundFrame};
use crate::events::{
    DispatchEvent, DomainEvent, GatewayEventType, InteractionCreateEvent, MessageCreateEvent,
};
use crate::protocol::{CloseCode, GatewayMessage, OpCode, ProtocolError, ReadyPayload};
use crate::queue::SlidingQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Close code of the socket (1006 when it failed without one)
    pub code: u16,
    pub reason: String,
    pub session_id: Option<String>,
    pub last_sequence: Option<u64>,
}

/// Close request raised while handling a frame
struct CloseRequest {
    code: u16,
    reason: &'static str,
}

/// One gateway session over one connection
pub struct GatewaySession {
    config: Arc<SessionConfig>,
    connection: Connection,
    state: Arc<Mutex<SessionState>>,
    queue: Arc<SlidingQueue<DomainEvent>>,
    health: HealthReporter,
    heartbeat: Option<JoinHandle<()>>,
}

impl GatewaySession {
    pub fn new(
        connection: Connection,
        config: Arc<SessionConfig>,
        queue: Arc<SlidingQueue<DomainEvent>>,
        health: HealthReporter,
    ) -> Self {
        Self {
            config,
            connection,
            state: Arc::new(Mutex::new(SessionState::default())),
            queue,
            health,
            heartbeat: None,
        }
    }

    /// Shared protocol state, mainly for inspection
    pub fn state(&self) -> Arc<Mutex<SessionState>> {
        Arc::clone(&self.state)
    }

    fn connection_id(&self) -> Uuid {
        self.connection.id()
    }

    /// Process frames until the connection closes or `shutdown` flips to `true`
    ///
    /// On exit the heartbeat is cancelled and the event queue is shut down.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SessionOutcome {
        let mut shutting_down = *shutdown.borrow();
        if shutting_down {
            self.connection.close(1000, "client shutdown").await;
        }

        while !shutting_down {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(connection_id = %self.connection_id(), "Shutdown requested, closing gateway session");
                        shutting_down = true;
                        self.connection.close(1000, "client shutdown").await;
                    }
                }
                frame = self.connection.next_frame() => {
                    let Some(frame) = frame else { break };
                    if let Some(request) = self.handle_frame(frame).await {
                        self.connection.close(request.code, request.reason).await;
                        break;
                    }
                }
            }
        }

        self.finish().await
    }

    async fn handle_frame(&mut self, frame: InboundFrame) -> Option<CloseRequest> {
        let text = match frame {
            InboundFrame::Text(text) => text,
            InboundFrame::Binary(bytes) => {
                let error = ProtocolError::UnexpectedBinary(bytes.len());
                tracing::warn!(connection_id = %self.connection_id(), error = %error, "Dropping gateway frame");
                return None;
            }
        };

        let message = match GatewayMessage::decode(&text) {
            Ok(message) => message,
            Err(e) if e.is_unknown_opcode() => {
                tracing::debug!(connection_id = %self.connection_id(), error = %e, "Ignoring unknown op code");
                return None;
            }
            Err(e) => {
                tracing::warn!(connection_id = %self.connection_id(), error = %e, "Dropping malformed gateway frame");
                return None;
            }
        };

        tracing::trace!(connection_id = %self.connection_id(), op = %message.op, "Received gateway message");

        match message.op {
            OpCode::Hello => self.on_hello(&message).await,
            OpCode::Dispatch => self.on_dispatch(message).await,
            OpCode::HeartbeatAck => self.on_heartbeat_ack().await,
            OpCode::Reconnect => {
                tracing::info!(connection_id = %self.connection_id(), "Gateway requested reconnect");
                return Some(CloseRequest {
                    code: CloseCode::Normal.as_u16(),
                    reason: "reconnect requested",
                });
            }
            OpCode::InvalidSession => {
                let resumable = message.d.as_ref().and_then(serde_json::Value::as_bool);
                tracing::warn!(
                    connection_id = %self.connection_id(),
                    resumable = ?resumable,
                    "Gateway invalidated the session"
                );
                return Some(CloseRequest {
                    code: CloseCode::SessionTimeout.as_u16(),
                    reason: "invalid session",
                });
            }
            op => {
                tracing::debug!(connection_id = %self.connection_id(), op = %op, "Ignoring op code");
            }
        }

        None
    }

    async fn on_hello(&mut self, message: &GatewayMessage) {
        let Some(hello) = message.as_hello() else {
            tracing::warn!(connection_id = %self.connection_id(), "Dropping invalid Hello");
            return;
        };
        let interval_ms = hello.heartbeat_interval.max(1);

        if let Some(previous) = self.heartbeat.take() {
            previous.abort();
        }

        // Identify goes out once per connection; a repeated Hello only resets the heartbeat.
        let first_hello = {
            let mut state = self.state.lock().await;
            state.heartbeat_interval_ms = Some(interval_ms);
            state.acknowledge_heartbeat();
            let first = state.phase == SessionPhase::AwaitingHello;
            if first {
                state.phase = SessionPhase::Identifying;
            }
            first
        };

        if first_hello {
            tracing::info!(
                connection_id = %self.connection_id(),
                heartbeat_interval_ms = interval_ms,
                "Received Hello, identifying"
            );
            self.identify().await;
        } else {
            tracing::debug!(
                connection_id = %self.connection_id(),
                heartbeat_interval_ms = interval_ms,
                "Repeated Hello, restarting heartbeat"
            );
        }

        self.heartbeat = Some(spawn_heartbeat(
            self.connection.sender(),
            Arc::clone(&self.state),
            Duration::from_millis(interval_ms),
            self.config.max_missed_acks,
        ));
    }

    async fn identify(&self) {
        let payload = match GatewayMessage::identify(&self.config.identify_payload())
            .and_then(|message| message.to_json().map_err(ProtocolError::Encode))
        {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(connection_id = %self.connection_id(), error = %e, "Failed to encode Identify");
                return;
            }
        };

        if let Err(e) = self.connection.send(payload).await {
            tracing::warn!(connection_id = %self.connection_id(), error = %e, "Failed to send Identify");
            return;
        }
        tracing::debug!(
            connection_id = %self.connection_id(),
            intents = %self.config.intents,
            privileged = self.config.intents.is_privileged(),
            "Identify sent"
        );
    }

    async fn on_dispatch(&self, message: GatewayMessage) {
        let GatewayMessage { t, s, d, .. } = message;
        let data = d.unwrap_or(serde_json::Value::Null);

        let mut state = self.state.lock().await;
        if let Some(sequence) = s {
            state.record_sequence(sequence);
        }

        let Some(event_type) = t else {
            tracing::warn!(connection_id = %self.connection_id(), seq = ?s, "Dropping dispatch without event name");
            return;
        };

        match GatewayEventType::from_str(&event_type) {
            Some(GatewayEventType::Ready) => match serde_json::from_value::<ReadyPayload>(data.clone()) {
                Ok(ready) => {
                    state.session_id = Some(ready.session_id.clone());
                    state.phase = SessionPhase::Ready;
                    self.health.mark_ready(&ready.session_id);
                    tracing::info!(
                        connection_id = %self.connection_id(),
                        session_id = %ready.session_id,
                        version = ready.v,
                        "Gateway session ready"
                    );
                }
                Err(e) => {
                    tracing::warn!(connection_id = %self.connection_id(), error = %e, "Invalid READY payload");
                }
            },
            Some(GatewayEventType::MessageCreate) => {
                match serde_json::from_value::<MessageCreateEvent>(data.clone()) {
                    Ok(message) => {
                        self.queue.offer(DomainEvent::MessageCreate {
                            sequence: s,
                            message: Box::new(message),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(connection_id = %self.connection_id(), seq = ?s, error = %e, "Invalid MESSAGE_CREATE payload");
                    }
                }
            }
            Some(GatewayEventType::InteractionCreate) => {
                match serde_json::from_value::<InteractionCreateEvent>(data.clone()) {
                    Ok(interaction) => {
                        self.queue.offer(DomainEvent::InteractionCreate {
                            sequence: s,
                            interaction: Box::new(interaction),
                        });
                    }
                    Err(e) => {
                        tracing::warn!(connection_id = %self.connection_id(), seq = ?s, error = %e, "Invalid INTERACTION_CREATE payload");
                    }
                }
            }
            _ => {}
        }
        drop(state);

        tracing::debug!(connection_id = %self.connection_id(), event = %event_type, seq = ?s, "Dispatch received");
        self.queue
            .offer(DomainEvent::Dispatch(DispatchEvent::new(event_type, s, data)));
    }

    async fn on_heartbeat_ack(&self) {
        self.state.lock().await.acknowledge_heartbeat();
        self.health.mark_heartbeat_ack();
        tracing::trace!(connection_id = %self.connection_id(), "Heartbeat acknowledged");
    }

    async fn finish(mut self) -> SessionOutcome {
        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }

        let terminal = self.connection.closed().await;
        let (code, reason) = match terminal {
            ConnectionState::Disconnected { code, reason } => (code, reason),
            ConnectionState::Failed { cause } => (CloseCode::Abnormal.as_u16(), cause),
            ConnectionState::Connecting | ConnectionState::Connected => {
                (CloseCode::Abnormal.as_u16(), String::new())
            }
        };

        let (session_id, last_sequence) = {
            let mut state = self.state.lock().await;
            state.phase = SessionPhase::Closed;
            (state.session_id.clone(), state.sequence)
        };
        self.queue.shutdown();

        tracing::info!(
            connection_id = %self.connection_id(),
            code,
            reason = %reason,
            close = %CloseCode::describe(code),
            "Gateway session closed"
        );

        SessionOutcome {
            code,
            reason,
            session_id,
            last_sequence,
        }
    }
}
