//! Gateway client integration tests
//!
//! Drive the full client (discovery, handshake, heartbeat, reconnect) against the
//! in-process mock gateway.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::{Duration, Instant};

use integration_tests::{
    hello, message_create, next_event_within, ready, test_client_config, wait_until,
    DiscoveryReply, MockGateway, Step, QUIET_HEARTBEAT_MS,
};
use serde_json::json;
use threadbot_gateway::{DomainEvent, GatewayClient, GatewayError};

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Handshake and delivery
// ============================================================================

#[tokio::test]
async fn test_handshake_and_message_delivery() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    mock.push_script(vec![
        Step::Send(hello(QUIET_HEARTBEAT_MS)),
        Step::Expect(2),
        Step::Send(ready(1, "sess-1")),
        Step::Send(message_create(2, "hello there")),
        Step::Hold {
            ack_heartbeats: true,
        },
    ]);

    let mut handle = GatewayClient::new(test_client_config(&mock)).start();

    let first = next_event_within(&mut handle, EVENT_TIMEOUT).await.expect("READY");
    assert_eq!(first.event_name(), "READY");
    assert_eq!(first.sequence(), Some(1));

    match next_event_within(&mut handle, EVENT_TIMEOUT).await {
        Some(DomainEvent::MessageCreate { sequence, message }) => {
            assert_eq!(sequence, Some(2));
            assert_eq!(message.content, "hello there");
            assert_eq!(message.author.username, "tester");
        }
        other => panic!("expected MESSAGE_CREATE, got {other:?}"),
    }

    let generic = next_event_within(&mut handle, EVENT_TIMEOUT).await.expect("dispatch");
    assert!(generic.is_dispatch());
    assert_eq!(generic.event_name(), "MESSAGE_CREATE");

    let identify = mock.received_with_op(2);
    assert_eq!(identify.len(), 1);
    assert_eq!(identify[0]["d"]["token"], "test-token");
    assert_eq!(mock.authorization_headers(), vec!["Bot test-token".to_string()]);

    let health = handle.health_snapshot();
    assert!(health.connected);
    assert_eq!(health.session_id.as_deref(), Some("sess-1"));

    handle.disconnect().await.expect("clean disconnect");
    assert!(wait_until(Duration::from_secs(2), || mock.client_closes().contains(&1000)).await);
}

#[tokio::test]
async fn test_heartbeat_acks_update_health() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    mock.push_script(vec![
        Step::Send(hello(100)),
        Step::Expect(2),
        Step::Hold {
            ack_heartbeats: true,
        },
    ]);

    let handle = GatewayClient::new(test_client_config(&mock)).start();
    let mut health = handle.health();

    let acked = tokio::time::timeout(
        EVENT_TIMEOUT,
        health.wait_for(|h| h.last_heartbeat_ack.is_some()),
    )
    .await
    .is_ok_and(|seen| seen.is_ok());
    assert!(acked, "no heartbeat ack recorded");

    let heartbeats = mock.received_with_op(1);
    assert!(!heartbeats.is_empty());
    assert!(heartbeats[0]["d"].is_null());
    assert!(handle.is_connected());

    handle.disconnect().await.expect("clean disconnect");
}

// ============================================================================
// Reconnection
// ============================================================================

#[tokio::test]
async fn test_reconnects_after_normal_close() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    mock.push_script(vec![
        Step::Send(hello(QUIET_HEARTBEAT_MS)),
        Step::Expect(2),
        Step::Send(ready(1, "sess-1")),
        Step::Close(1000, "going away"),
    ]);
    mock.push_script(vec![
        Step::Send(hello(QUIET_HEARTBEAT_MS)),
        Step::Expect(2),
        Step::Send(ready(1, "sess-2")),
        Step::Send(message_create(2, "again")),
        Step::Hold {
            ack_heartbeats: true,
        },
    ]);

    let mut handle = GatewayClient::new(test_client_config(&mock)).start();

    let first = next_event_within(&mut handle, EVENT_TIMEOUT).await.expect("first READY");
    assert_eq!(first.event_name(), "READY");
    let closed_at = Instant::now();

    let second = next_event_within(&mut handle, Duration::from_secs(10))
        .await
        .expect("second READY");
    assert_eq!(second.event_name(), "READY");
    assert!(closed_at.elapsed() >= Duration::from_millis(1900));

    let message = next_event_within(&mut handle, EVENT_TIMEOUT).await.expect("message");
    assert!(matches!(message, DomainEvent::MessageCreate { .. }));

    assert_eq!(mock.connections(), 2);
    assert_eq!(mock.received_with_op(2).len(), 2);
    assert_eq!(handle.health_snapshot().session_id.as_deref(), Some("sess-2"));
    assert_eq!(handle.health_snapshot().last_close_code, Some(1000));

    handle.disconnect().await.expect("clean disconnect");
}

#[tokio::test]
async fn test_authentication_failure_stops_client() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    mock.push_script(vec![
        Step::Send(hello(QUIET_HEARTBEAT_MS)),
        Step::Expect(2),
        Step::Close(4004, "Authentication failed"),
    ]);

    let mut handle = GatewayClient::new(test_client_config(&mock)).start();

    assert!(next_event_within(&mut handle, EVENT_TIMEOUT).await.is_none());

    let result = tokio::time::timeout(EVENT_TIMEOUT, handle.stopped())
        .await
        .expect("supervisor should stop");
    assert!(matches!(result, Err(GatewayError::AuthenticationFailed(_))));

    let health = handle.health_snapshot();
    assert!(health.stopped);
    assert_eq!(health.last_close_code, Some(4004));
    assert_eq!(mock.connections(), 1);
}

// ============================================================================
// Discovery
// ============================================================================

#[tokio::test]
async fn test_discovery_rate_limit_is_honoured() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    mock.push_discovery(DiscoveryReply {
        status: 429,
        body: json!({"message": "You are being rate limited.", "retry_after": 0.2, "global": false}),
        retry_after: Some("1".to_string()),
    });
    mock.push_script(vec![
        Step::Send(hello(QUIET_HEARTBEAT_MS)),
        Step::Expect(2),
        Step::Send(ready(1, "sess-1")),
        Step::Hold {
            ack_heartbeats: true,
        },
    ]);

    let started = Instant::now();
    let mut handle = GatewayClient::new(test_client_config(&mock)).start();

    let event = next_event_within(&mut handle, EVENT_TIMEOUT).await.expect("READY");
    assert_eq!(event.event_name(), "READY");
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert_eq!(mock.discovery_requests(), 2);

    handle.disconnect().await.expect("clean disconnect");
}

#[tokio::test]
async fn test_rejected_token_on_discovery_is_fatal() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    mock.push_discovery(DiscoveryReply {
        status: 401,
        body: json!({"message": "401: Unauthorized", "code": 0}),
        retry_after: None,
    });

    let mut handle = GatewayClient::new(test_client_config(&mock)).start();

    let result = tokio::time::timeout(EVENT_TIMEOUT, handle.stopped())
        .await
        .expect("supervisor should stop");
    assert!(matches!(result, Err(GatewayError::AuthenticationFailed(_))));
    assert_eq!(mock.discovery_requests(), 1);
    assert_eq!(mock.connections(), 0);
    assert!(handle.next_event().await.is_none());
}

// ============================================================================
// Connection failures and shutdown
// ============================================================================

#[tokio::test]
async fn test_unreachable_gateway_exhausts_retries() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    let config = test_client_config(&mock).with_gateway_url("ws://127.0.0.1:1/gateway");

    let mut handle = GatewayClient::new(config).start();

    let result = tokio::time::timeout(EVENT_TIMEOUT, handle.stopped())
        .await
        .expect("supervisor should stop");
    match result {
        Err(GatewayError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(mock.discovery_requests(), 0);
    assert!(handle.health_snapshot().stopped);
}

#[tokio::test]
async fn test_disconnect_interrupts_backoff() {
    let mock = MockGateway::start().await.expect("Failed to start mock gateway");
    let mut config = test_client_config(&mock).with_gateway_url("ws://127.0.0.1:1/gateway");
    config.backoff.base_delay = Duration::from_secs(30);
    config.backoff.max_delay = Duration::from_secs(30);

    let handle = GatewayClient::new(config).start();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    handle.disconnect().await.expect("clean disconnect");
    assert!(started.elapsed() < Duration::from_secs(2));
}
