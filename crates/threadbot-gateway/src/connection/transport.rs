//! WebSocket transport
//!
//! A [`Connection`] owns exactly one physical socket. The socket itself lives in a driver
//! task, which is the only writer of the connection state: it forwards inbound frames,
//! performs outbound writes on request and publishes exactly one terminal state.

use super::{ConnectionState, InboundFrame, TransportError};
use futures::stream::{self, Stream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_tungstenite::tungstenite::error::ProtocolError as WsProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

/// Time allowed for the socket to reach the open state
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Time the peer gets to answer a close frame before the socket is dropped
pub const CLOSE_GRACE: Duration = Duration::from_millis(100);

/// Close code recorded when the peer vanishes without a close frame
const ABNORMAL_CLOSURE: u16 = 1006;

enum Command {
    Send {
        text: String,
        ack: oneshot::Sender<Result<(), TransportError>>,
    },
    Close {
        code: u16,
        reason: String,
        done: oneshot::Sender<()>,
    },
}

/// One open gateway socket
pub struct Connection {
    id: Uuid,
    url: String,
    sender: ConnectionSender,
    frames: mpsc::UnboundedReceiver<InboundFrame>,
}

impl Connection {
    /// Open a socket to `url`, failing if it is not open within `timeout`
    ///
    /// On timeout the in-flight handshake is dropped, which tears the socket down.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, TransportError> {
        tracing::info!(url = %url, timeout_ms = timeout.as_millis(), "Connecting to gateway");

        let (ws, _response) = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| TransportError::ConnectTimeout {
                url: url.to_string(),
                timeout,
            })?
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_socket(url, ws))
    }

    /// Wrap an already-open WebSocket
    ///
    /// The frame channel exists before the driver starts, so nothing read from the
    /// socket can be lost.
    pub fn from_socket<S>(url: impl Into<String>, ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let id = Uuid::new_v4();
        let url = url.into();

        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();

        state_tx.send_replace(ConnectionState::Connected);
        tracing::info!(connection_id = %id, url = %url, "Gateway socket connected");

        tokio::spawn(drive(id, ws, command_rx, frame_tx, state_tx));

        Self {
            id,
            url,
            sender: ConnectionSender {
                id,
                commands: command_tx,
                state: state_rx,
            },
            frames: frame_rx,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.sender.state()
    }

    /// A cloneable handle for sending and closing from other tasks
    #[must_use]
    pub fn sender(&self) -> ConnectionSender {
        self.sender.clone()
    }

    /// Next inbound frame; `None` once the connection has closed
    pub async fn next_frame(&mut self) -> Option<InboundFrame> {
        self.frames.recv().await
    }

    /// Inbound frames as a stream ending when the connection closes
    pub fn messages(&mut self) -> impl Stream<Item = InboundFrame> + '_ {
        stream::poll_fn(move |cx| self.frames.poll_recv(cx))
    }

    /// State changes as a stream, starting with the current state and ending after the
    /// terminal one
    ///
    /// Intermediate values may be coalesced; the terminal state is always delivered.
    #[must_use]
    pub fn states(&self) -> impl Stream<Item = ConnectionState> + Send + 'static {
        self.sender.states()
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.sender.send(text).await
    }

    pub async fn close(&self, code: u16, reason: &str) {
        self.sender.close(code, reason).await;
    }

    /// Wait for the terminal state
    pub async fn closed(&self) -> ConnectionState {
        self.sender.closed().await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Send/close capability for one connection
#[derive(Clone)]
pub struct ConnectionSender {
    id: Uuid,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionSender {
    #[must_use]
    pub fn connection_id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Write a text frame
    ///
    /// Fails with [`TransportError::State`] unless the socket is open and with
    /// [`TransportError::Send`] if the write itself fails.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), TransportError> {
        let state = self.state();
        if !state.is_connected() {
            return Err(TransportError::State { state });
        }

        let (ack, ack_rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                text: text.into(),
                ack,
            })
            .map_err(|_| self.state_error())?;

        ack_rx.await.map_err(|_| self.state_error())?
    }

    /// Close the socket with `code` and wait for it to be released
    ///
    /// Idempotent: once the connection is terminal this returns immediately.
    pub async fn close(&self, code: u16, reason: &str) {
        if self.state().is_terminal() {
            return;
        }

        let (done, done_rx) = oneshot::channel();
        let command = Command::Close {
            code,
            reason: reason.to_string(),
            done,
        };
        if self.commands.send(command).is_ok() {
            // Dropped unanswered when another close won the race
            let _ = done_rx.await;
        }
    }

    pub async fn closed(&self) -> ConnectionState {
        let mut rx = self.state.clone();
        let terminal = rx
            .wait_for(ConnectionState::is_terminal)
            .await
            .map(|state| (*state).clone());
        match terminal {
            Ok(state) => state,
            Err(_) => rx.borrow().clone(),
        }
    }

    #[must_use]
    pub fn states(&self) -> impl Stream<Item = ConnectionState> + Send + 'static {
        stream::unfold(Some((self.state.clone(), true)), |cursor| async move {
            let (mut rx, first) = cursor?;
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let current = rx.borrow_and_update().clone();
            let next = if current.is_terminal() {
                None
            } else {
                Some((rx, false))
            };
            Some((current, next))
        })
    }

    fn state_error(&self) -> TransportError {
        TransportError::State {
            state: self.state(),
        }
    }
}

impl std::fmt::Debug for ConnectionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSender")
            .field("connection_id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Socket driver: owns the WebSocket until the connection reaches a terminal state
async fn drive<S>(
    id: Uuid,
    mut ws: WebSocketStream<S>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    frames: mpsc::UnboundedSender<InboundFrame>,
    state: watch::Sender<ConnectionState>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut close_ack = None;

    let terminal = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send { text, ack }) => {
                    tracing::trace!(connection_id = %id, bytes = text.len(), "Sending frame");
                    match ws.send(Message::Text(text)).await {
                        Ok(()) => {
                            let _ = ack.send(Ok(()));
                        }
                        Err(e) => {
                            let cause = e.to_string();
                            let _ = ack.send(Err(TransportError::Send(cause.clone())));
                            break ConnectionState::Failed { cause };
                        }
                    }
                }
                Some(Command::Close { code, reason, done }) => {
                    close_gracefully(id, &mut ws, code, &reason).await;
                    close_ack = Some(done);
                    break ConnectionState::Disconnected { code, reason };
                }
                None => {
                    // Every sender dropped
                    close_gracefully(id, &mut ws, 1000, "").await;
                    break ConnectionState::Disconnected { code: 1000, reason: String::new() };
                }
            },
            incoming = ws.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::trace!(connection_id = %id, bytes = text.len(), "Received text frame");
                    let _ = frames.send(InboundFrame::Text(text));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    tracing::trace!(connection_id = %id, bytes = bytes.len(), "Received binary frame");
                    let _ = frames.send(InboundFrame::Binary(bytes));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or((1000, String::new()), |f| {
                        (u16::from(f.code), f.reason.into_owned())
                    });
                    // Flush the close reply tungstenite queued
                    let _ = tokio::time::timeout(CLOSE_GRACE, ws.close(None)).await;
                    break ConnectionState::Disconnected { code, reason };
                }
                // Ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(WsError::Protocol(WsProtocolError::ResetWithoutClosingHandshake))) | None => {
                    break ConnectionState::Disconnected {
                        code: ABNORMAL_CLOSURE,
                        reason: "connection reset without close frame".to_string(),
                    };
                }
                Some(Err(e)) => {
                    break ConnectionState::Failed { cause: e.to_string() };
                }
            },
        }
    };

    drop(frames);
    drop(ws);

    match &terminal {
        ConnectionState::Failed { cause } => {
            tracing::warn!(connection_id = %id, cause = %cause, "Gateway socket failed");
        }
        ConnectionState::Disconnected { code, reason } => {
            tracing::info!(connection_id = %id, code, reason = %reason, "Gateway socket closed");
        }
        ConnectionState::Connecting | ConnectionState::Connected => {}
    }

    state.send_replace(terminal);
    if let Some(done) = close_ack {
        let _ = done.send(());
    }
}

/// Send a close frame and give the peer [`CLOSE_GRACE`] to answer
async fn close_gracefully<S>(id: Uuid, ws: &mut WebSocketStream<S>, code: u16, reason: &str)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = CloseFrame {
        code: WsCloseCode::from(code),
        reason: reason.to_owned().into(),
    };

    let handshake = async {
        if ws.close(Some(frame)).await.is_err() {
            return;
        }
        while let Some(Ok(message)) = ws.next().await {
            if message.is_close() {
                break;
            }
        }
    };

    if tokio::time::timeout(CLOSE_GRACE, handshake).await.is_err() {
        tracing::debug!(connection_id = %id, code, "Close handshake timed out, terminating socket");
    }
}
