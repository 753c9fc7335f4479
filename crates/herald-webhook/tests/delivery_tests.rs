// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP delivery tests for the webhook engine against a local mock server.

use std::sync::Arc;

use herald_config::WebhookConfig;
use herald_core::SessionId;
use herald_test_utils::MockStateStore;
use herald_webhook::{Priority, WebhookEngine, compute_signature};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "delivery-test-secret";

fn engine_with_store() -> (Arc<WebhookEngine>, Arc<MockStateStore>) {
    let store = Arc::new(MockStateStore::new());
    let config = WebhookConfig {
        secret: Some(SECRET.into()),
        ..WebhookConfig::default()
    };
    let engine = WebhookEngine::new(store.clone(), config).expect("engine should build");
    (engine, store)
}

#[tokio::test]
async fn successful_delivery_records_success_and_empties_queue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (engine, _store) = engine_with_store();
    let sid = SessionId("s-1".into());
    engine.set_webhook_url(&sid, format!("{}/hook", server.uri()));
    engine.enqueue(
        &sid,
        "session.status",
        serde_json::json!({"status": "connected"}),
        Priority::High,
    );

    engine.tick().await;

    assert_eq!(engine.main_queue_len(), 0);
    assert_eq!(engine.retry_queue_len(), 0);
    let stats = engine.stats(&sid).expect("stats recorded");
    assert_eq!(stats.total_sent, 1);
    assert_eq!(stats.successful, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn envelope_carries_required_fields_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("content-type", "application/json"))
        .and(header("x-webhook-event", "session.status"))
        .and(header("x-session-id", "s-42"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (engine, _store) = engine_with_store();
    let sid = SessionId("s-42".into());
    engine.set_webhook_url(&sid, server.uri());
    engine.enqueue(
        &sid,
        "session.status",
        serde_json::json!({"status": "qr_pending"}),
        Priority::High,
    );

    engine.tick().await;

    let requests = server.received_requests().await.expect("requests recorded");
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let envelope: serde_json::Value =
        serde_json::from_slice(&request.body).expect("body is JSON");
    assert_eq!(envelope["event"], "session.status");
    assert_eq!(envelope["sessionId"], "s-42");
    assert_eq!(envelope["data"]["status"], "qr_pending");
    assert!(envelope["timestamp"].is_string());
    assert!(envelope["webhookId"].is_string());

    // Any 2xx counts as success.
    let stats = engine.stats(&sid).expect("stats recorded");
    assert_eq!(stats.successful, 1);
}

#[tokio::test]
async fn signature_header_verifies_against_body_and_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (engine, _store) = engine_with_store();
    let sid = SessionId("s-sign".into());
    engine.set_webhook_url(&sid, server.uri());
    engine.enqueue(
        &sid,
        "connection.status",
        serde_json::json!({"connected": true}),
        Priority::High,
    );

    engine.tick().await;

    let requests = server.received_requests().await.expect("requests recorded");
    let request = &requests[0];
    let received_sig = request
        .headers
        .get("x-webhook-signature")
        .expect("signature header present")
        .to_str()
        .expect("signature is ASCII");

    let expected = compute_signature(&request.body, "s-sign", SECRET);
    assert_eq!(received_sig, expected);
}

#[tokio::test]
async fn non_2xx_response_moves_job_to_retry_queue() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (engine, _store) = engine_with_store();
    let sid = SessionId("s-1".into());
    engine.set_webhook_url(&sid, server.uri());
    engine.enqueue(&sid, "session.status", serde_json::json!({}), Priority::High);

    engine.tick().await;

    assert_eq!(engine.main_queue_len(), 0);
    assert_eq!(engine.retry_queue_len(), 1);
    let stats = engine.stats(&sid).expect("stats recorded");
    assert_eq!(stats.total_sent, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.permanently_failed, 0);
}

#[tokio::test]
async fn single_attempt_budget_fails_permanently_on_first_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = Arc::new(MockStateStore::new());
    let config = WebhookConfig {
        secret: Some(SECRET.into()),
        max_retries: 1,
        ..WebhookConfig::default()
    };
    let engine = WebhookEngine::new(store.clone(), config).expect("engine should build");

    let sid = SessionId("s-1".into());
    engine.set_webhook_url(&sid, server.uri());
    engine.enqueue(&sid, "session.status", serde_json::json!({}), Priority::High);

    engine.tick().await;

    assert_eq!(engine.main_queue_len(), 0);
    assert_eq!(engine.retry_queue_len(), 0);
    let stats = engine.stats(&sid).expect("stats recorded");
    assert_eq!(stats.permanently_failed, 1);

    // Outcome statistics were pushed through the state store.
    assert!(!store.saved_stats().await.is_empty());
}

#[tokio::test]
async fn stats_persistence_failure_does_not_block_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = Arc::new(MockStateStore::new());
    store.set_fail_saves(true);
    let config = WebhookConfig {
        secret: Some(SECRET.into()),
        ..WebhookConfig::default()
    };
    let engine = WebhookEngine::new(store, config).expect("engine should build");

    let sid = SessionId("s-1".into());
    engine.set_webhook_url(&sid, server.uri());
    engine.enqueue(&sid, "session.status", serde_json::json!({}), Priority::High);

    engine.tick().await;

    let stats = engine.stats(&sid).expect("in-memory stats still recorded");
    assert_eq!(stats.successful, 1);
}
