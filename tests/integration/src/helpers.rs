//! Test helpers for integration tests
//!
//! [`MockGateway`] serves `GET /api/gateway/bot` and a WebSocket gateway at `/gateway`.
//! Each accepted socket plays the next queued [`Step`] script; everything the client
//! sends is recorded for assertions.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use threadbot_common::AppConfig;
use threadbot_gateway::client::ClientConfig;
use threadbot_gateway::{DomainEvent, GatewayHandle};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Heartbeat interval announced by the default Hello; long enough to stay out of the way
pub const QUIET_HEARTBEAT_MS: u64 = 45_000;

/// One action of a scripted gateway connection
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a JSON payload as a text frame
    Send(Value),
    /// Read client frames until one carries this op code
    Expect(u8),
    Sleep(Duration),
    /// Send a close frame and drain until the client goes away
    Close(u16, &'static str),
    /// Keep the socket open until the client closes it
    Hold { ack_heartbeats: bool },
}

/// Canned answer for `GET /api/gateway/bot`
#[derive(Debug, Clone)]
pub struct DiscoveryReply {
    pub status: u16,
    pub body: Value,
    pub retry_after: Option<String>,
}

#[derive(Default)]
struct Recorded {
    scripts: VecDeque<Vec<Step>>,
    discovery: VecDeque<DiscoveryReply>,
    received: Vec<Value>,
    client_closes: Vec<u16>,
    authorization: Vec<String>,
    connections: usize,
}

struct MockState {
    gateway_url: String,
    recorded: Mutex<Recorded>,
}

/// Mock platform serving discovery and the gateway socket on an ephemeral port
pub struct MockGateway {
    pub addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockGateway {
    /// Start the mock server
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(MockState {
            gateway_url: format!("ws://{addr}/gateway"),
            recorded: Mutex::new(Recorded::default()),
        });

        let app = Router::new()
            .route("/api/gateway/bot", get(discovery))
            .route("/gateway", get(gateway))
            .with_state(Arc::clone(&state));

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// REST base handed to the client
    pub fn api_base(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn gateway_url(&self) -> String {
        self.state.gateway_url.clone()
    }

    /// Queue the script for the next accepted connection
    ///
    /// Connections without a script get Hello, wait for Identify, then hold.
    pub fn push_script(&self, steps: Vec<Step>) {
        self.state.recorded.lock().scripts.push_back(steps);
    }

    /// Queue a discovery answer; without one the server answers 200 with its gateway URL
    pub fn push_discovery(&self, reply: DiscoveryReply) {
        self.state.recorded.lock().discovery.push_back(reply);
    }

    pub fn connections(&self) -> usize {
        self.state.recorded.lock().connections
    }

    pub fn discovery_requests(&self) -> usize {
        self.state.recorded.lock().authorization.len()
    }

    /// `Authorization` headers seen by the discovery endpoint
    pub fn authorization_headers(&self) -> Vec<String> {
        self.state.recorded.lock().authorization.clone()
    }

    /// Every payload the client sent, in arrival order
    pub fn received(&self) -> Vec<Value> {
        self.state.recorded.lock().received.clone()
    }

    pub fn received_with_op(&self, op: u8) -> Vec<Value> {
        self.received()
            .into_iter()
            .filter(|payload| payload_op(payload) == Some(op))
            .collect()
    }

    /// Close codes sent by the client
    pub fn client_closes(&self) -> Vec<u16> {
        self.state.recorded.lock().client_closes.clone()
    }
}

impl Drop for MockGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn discovery(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let reply = {
        let mut recorded = state.recorded.lock();
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        recorded.authorization.push(auth);
        recorded.discovery.pop_front()
    };

    let reply = reply.unwrap_or_else(|| DiscoveryReply {
        status: 200,
        body: json!({
            "url": state.gateway_url,
            "shards": 1,
            "session_start_limit": {
                "total": 1000,
                "remaining": 999,
                "reset_after": 14_400_000,
                "max_concurrency": 1
            }
        }),
        retry_after: None,
    });

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut response = (status, Json(reply.body)).into_response();
    if let Some(value) = reply.retry_after.and_then(|v| v.parse().ok()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }
    response
}

async fn gateway(ws: WebSocketUpgrade, State(state): State<Arc<MockState>>) -> Response {
    let script = {
        let mut recorded = state.recorded.lock();
        recorded.connections += 1;
        recorded.scripts.pop_front()
    };
    let script = script.unwrap_or_else(|| {
        vec![
            Step::Send(hello(QUIET_HEARTBEAT_MS)),
            Step::Expect(2),
            Step::Hold {
                ack_heartbeats: true,
            },
        ]
    });

    ws.on_upgrade(move |socket| play(socket, state, script))
}

async fn play(mut socket: WebSocket, state: Arc<MockState>, script: Vec<Step>) {
    for step in script {
        match step {
            Step::Send(payload) => {
                if socket.send(Message::Text(payload.to_string())).await.is_err() {
                    return;
                }
            }
            Step::Expect(op) => loop {
                match read(&mut socket, &state).await {
                    Some(payload) if payload_op(&payload) == Some(op) => break,
                    Some(_) => {}
                    None => return,
                }
            },
            Step::Sleep(duration) => tokio::time::sleep(duration).await,
            Step::Close(code, reason) => {
                let frame = CloseFrame {
                    code,
                    reason: reason.into(),
                };
                if socket.send(Message::Close(Some(frame))).await.is_err() {
                    return;
                }
                while read(&mut socket, &state).await.is_some() {}
                return;
            }
            Step::Hold { ack_heartbeats } => {
                while let Some(payload) = read(&mut socket, &state).await {
                    if ack_heartbeats && payload_op(&payload) == Some(1) {
                        let ack = json!({"op": 11, "d": null, "s": null, "t": null});
                        if socket.send(Message::Text(ack.to_string())).await.is_err() {
                            return;
                        }
                    }
                }
                return;
            }
        }
    }
}

/// Next JSON payload from the client, recording it; `None` once the socket is done
async fn read(socket: &mut WebSocket, state: &MockState) -> Option<Value> {
    loop {
        match socket.recv().await? {
            Ok(Message::Text(text)) => {
                let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                state.recorded.lock().received.push(payload.clone());
                return Some(payload);
            }
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    state.recorded.lock().client_closes.push(frame.code);
                }
            }
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

fn payload_op(payload: &Value) -> Option<u8> {
    payload
        .get("op")
        .and_then(Value::as_u64)
        .and_then(|op| u8::try_from(op).ok())
}

/// Client configuration pointed at the mock, with short retry delays
///
/// Goes through the same environment mapping the binary uses.
pub fn test_client_config(mock: &MockGateway) -> ClientConfig {
    let api_base = mock.api_base();
    let vars = [
        ("DISCORD_TOKEN", "test-token"),
        ("DISCORD_API_BASE", api_base.as_str()),
        ("CONNECT_TIMEOUT_SECS", "5"),
        ("RECONNECT_MAX_ATTEMPTS", "3"),
        ("RECONNECT_BASE_DELAY_MS", "20"),
        ("RECONNECT_MAX_DELAY_MS", "100"),
        ("RECONNECT_RESTART_DELAY_SECS", "0"),
        ("CIRCUIT_BREAKER_THRESHOLD", "10"),
        ("CIRCUIT_BREAKER_COOLDOWN_SECS", "1"),
    ];
    let app_config = AppConfig::from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| (*value).to_string())
    })
    .expect("test configuration is valid");

    let mut config = ClientConfig::from(&app_config);
    config.discovery.retry_delay = Duration::from_millis(50);
    config.backoff.jitter = 0.0;
    config
}

pub fn hello(interval_ms: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": interval_ms}, "s": null, "t": null})
}

pub fn dispatch(event: &str, seq: u64, data: Value) -> Value {
    json!({"op": 0, "s": seq, "t": event, "d": data})
}

pub fn ready(seq: u64, session_id: &str) -> Value {
    dispatch("READY", seq, json!({"v": 10, "session_id": session_id, "guilds": []}))
}

pub fn message_create(seq: u64, content: &str) -> Value {
    dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": "1000",
            "channel_id": "2000",
            "guild_id": "3000",
            "author": {"id": "4000", "username": "tester"},
            "content": content,
            "timestamp": "2024-01-01T00:00:00Z"
        }),
    )
}

/// Next event, or `None` if nothing arrives within `timeout`
pub async fn next_event_within(handle: &mut GatewayHandle, timeout: Duration) -> Option<DomainEvent> {
    tokio::time::timeout(timeout, handle.next_event())
        .await
        .ok()
        .flatten()
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
