// ABOUTME: Integration tests for the WebSocket session state machine driven over channels
// ABOUTME: Covers auth gating, completion-order correlation, duplicate ids, pings, close, and shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

use switchyard_server::events::Notification;
use switchyard_server::state::SharedState;
use switchyard_server::ws::messages::ServerMessage;
use switchyard_server::ws::session::{run_session, InboundFrame, SessionContext};

use common::{AUTOMATION_TOKEN, CURSOR_TOKEN, LIMITED_TOKEN};

struct Client {
    inbound: mpsc::Sender<InboundFrame>,
    outbound: mpsc::Receiver<ServerMessage>,
    task: JoinHandle<()>,
    connection_id: String,
}

impl Client {
    fn connect(state: &SharedState, connection_id: &str) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(16);
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let ctx = SessionContext {
            dispatcher: Arc::clone(state.dispatcher()),
            sessions: Arc::clone(&state.sessions),
            events: state.events.clone(),
            connection_id: connection_id.to_owned(),
            metadata: HashMap::new(),
        };
        let task = tokio::spawn(run_session(
            ReceiverStream::new(inbound_rx),
            outbound_tx,
            ctx,
            state.shutdown_signal(),
        ));
        Self {
            inbound: inbound_tx,
            outbound: outbound_rx,
            task,
            connection_id: connection_id.to_owned(),
        }
    }

    async fn send(&self, frame: Value) {
        self.inbound
            .send(InboundFrame::Text(frame.to_string()))
            .await
            .expect("session alive");
    }

    async fn send_raw(&self, text: &str) {
        self.inbound
            .send(InboundFrame::Text(text.to_owned()))
            .await
            .expect("session alive");
    }

    async fn recv(&mut self) -> ServerMessage {
        tokio::time::timeout(Duration::from_secs(30), self.outbound.recv())
            .await
            .expect("message before timeout")
            .expect("channel open")
    }

    async fn authenticate(&mut self, token: &str) {
        let status = self.recv().await;
        assert_eq!(status.data["state"], "auth_required");
        self.send(json!({ "type": "auth", "id": "auth-1", "data": { "token": token } }))
            .await;
        let status = self.recv().await;
        assert_eq!(status.data["state"], "authenticated");
    }
}

fn wait_call(id: &str, millis: u64) -> Value {
    json!({
        "type": "tool_call",
        "id": id,
        "data": {
            "serverId": "delay",
            "toolName": "wait",
            "params": { "millis": millis, "label": id }
        }
    })
}

#[tokio::test]
async fn greets_with_auth_required_and_connection_id() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-greet");

    let first = client.recv().await;
    assert_eq!(first.msg_type, "status");
    assert_eq!(first.data["state"], "auth_required");
    assert_eq!(first.data["connectionId"], "conn-greet");
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn calls_before_auth_are_rejected_but_connection_stays_open() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-unauth");
    client.recv().await;

    client.send(wait_call("x1", 0)).await;
    let rejected = client.recv().await;
    assert_eq!(rejected.id.as_deref(), Some("x1"));
    assert_eq!(rejected.error_code(), Some("auth_required"));

    client
        .send(json!({ "type": "auth", "id": "a1", "data": { "token": "wrong" } }))
        .await;
    let failed = client.recv().await;
    assert_eq!(failed.id.as_deref(), Some("a1"));
    assert_eq!(failed.error_code(), Some("auth_failed"));

    client
        .send(json!({ "type": "auth", "id": "a2", "data": { "token": AUTOMATION_TOKEN } }))
        .await;
    let status = client.recv().await;
    assert_eq!(status.data["state"], "authenticated");
    assert_eq!(status.data["identity"], "automation-script");

    let connections = state.sessions.list();
    assert_eq!(connections.len(), 1);
    assert_eq!(connections[0].identity.as_deref(), Some("automation-script"));
}

#[tokio::test]
async fn ping_is_answered_in_any_state_without_spending_quota() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-ping");
    client.recv().await;

    client.send(json!({ "type": "ping", "id": "p0" })).await;
    let pong = client.recv().await;
    assert_eq!(pong.msg_type, "pong");
    assert_eq!(pong.id.as_deref(), Some("p0"));

    client
        .send(json!({ "type": "auth", "data": { "token": LIMITED_TOKEN } }))
        .await;
    client.recv().await;

    for i in 0..5 {
        client.send(json!({ "type": "ping", "id": format!("p{}", i + 1) })).await;
        assert_eq!(client.recv().await.msg_type, "pong");
    }

    let identity = state.guard().identity("limited-bot").expect("identity");
    assert_eq!(state.guard().remaining(&identity), Some(2));
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_are_delivered_in_completion_order() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-order");
    client.authenticate(AUTOMATION_TOKEN).await;

    client.send(wait_call("slow", 300)).await;
    client.send(wait_call("fast", 100)).await;
    client.send(wait_call("medium", 200)).await;

    let mut order = Vec::new();
    for _ in 0..3 {
        let response = client.recv().await;
        assert_eq!(response.msg_type, "tool_response");
        let id = response.id.clone().expect("correlated");
        assert_eq!(response.data["result"]["label"], id.as_str());
        assert_eq!(response.data["serverId"], "delay");
        assert_eq!(response.data["toolName"], "wait");
        order.push(id);
    }
    assert_eq!(order, vec!["fast", "medium", "slow"]);
}

#[tokio::test(start_paused = true)]
async fn duplicate_in_flight_id_is_rejected() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-dup");
    client.authenticate(AUTOMATION_TOKEN).await;

    client.send(wait_call("dup", 1000)).await;
    client.send(wait_call("dup", 10)).await;

    let rejected = client.recv().await;
    assert_eq!(rejected.id.as_deref(), Some("dup"));
    assert_eq!(rejected.error_code(), Some("duplicate_request"));

    let delivered = client.recv().await;
    assert_eq!(delivered.msg_type, "tool_response");
    assert_eq!(delivered.data["result"]["label"], "dup");

    // The id is free again once the first call completed
    client.send(wait_call("dup", 10)).await;
    assert_eq!(client.recv().await.msg_type, "tool_response");
}

#[tokio::test]
async fn permission_and_validation_errors_use_stream_codes() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-errors");
    client.authenticate(CURSOR_TOKEN).await;

    client
        .send(json!({
            "type": "tool_call",
            "id": "gh",
            "data": { "serverId": "github", "toolName": "create_issue", "params": { "title": "Bug" } }
        }))
        .await;
    let denied = client.recv().await;
    assert_eq!(denied.id.as_deref(), Some("gh"));
    assert_eq!(denied.error_code(), Some("permission_denied"));

    client
        .send(json!({
            "type": "tool_call",
            "id": "bad",
            "data": { "serverId": "memory", "toolName": "memory_store", "params": { "project": "p" } }
        }))
        .await;
    let invalid = client.recv().await;
    assert_eq!(invalid.error_code(), Some("invalid_arguments"));
    assert!(invalid.data["details"]["violations"].is_array());
}

#[tokio::test]
async fn list_tools_returns_visible_adapters() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-list");
    client.authenticate(CURSOR_TOKEN).await;

    client.send(json!({ "type": "list_tools", "id": "l1" })).await;
    let list = client.recv().await;
    assert_eq!(list.msg_type, "tool_list");
    assert_eq!(list.id.as_deref(), Some("l1"));
    let names: Vec<&str> = list.data["servers"]
        .as_array()
        .expect("servers")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["delay", "memory"]);
}

#[tokio::test]
async fn garbage_frames_are_invalid_message() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-garbage");
    client.recv().await;

    client.send_raw("{{{").await;
    assert_eq!(client.recv().await.error_code(), Some("invalid_message"));

    client.send(json!({ "type": "subscribe", "id": "s1" })).await;
    let unknown = client.recv().await;
    assert_eq!(unknown.id.as_deref(), Some("s1"));
    assert_eq!(unknown.error_code(), Some("invalid_message"));

    client.send(json!({ "type": "ping" })).await;
    assert_eq!(client.recv().await.msg_type, "pong");
}

#[tokio::test]
async fn rate_limit_applies_per_tool_call() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-rate");
    client.authenticate(LIMITED_TOKEN).await;

    for id in ["r1", "r2"] {
        client
            .send(json!({
                "type": "tool_call",
                "id": id,
                "data": { "serverId": "memory", "toolName": "memory_list", "params": { "project": "p" } }
            }))
            .await;
        assert_eq!(client.recv().await.msg_type, "tool_response");
    }

    client
        .send(json!({
            "type": "tool_call",
            "id": "r3",
            "data": { "serverId": "memory", "toolName": "memory_list", "params": { "project": "p" } }
        }))
        .await;
    let limited = client.recv().await;
    assert_eq!(limited.id.as_deref(), Some("r3"));
    assert_eq!(limited.error_code(), Some("rate_limited"));
    assert!(limited.data["details"]["retryAfterSecs"].as_u64().is_some());
}

#[tokio::test(start_paused = true)]
async fn close_unregisters_and_drops_abandoned_responses() {
    let state = common::test_state();
    let mut notifications = state.events.subscribe();
    let mut client = Client::connect(&state, "conn-close");
    client.authenticate(AUTOMATION_TOKEN).await;

    client.send(wait_call("abandoned", 500)).await;
    client.send(json!({ "type": "close" })).await;
    client.task.await.expect("session task");

    assert!(state.sessions.is_empty());
    assert_eq!(
        notifications.recv().await.expect("opened"),
        Notification::ConnectionsChanged { connections: 1 }
    );
    assert_eq!(
        notifications.recv().await.expect("closed"),
        Notification::ConnectionsChanged { connections: 0 }
    );

    // The spawned call finishes, finds the connection gone, and drops its sender
    let next = tokio::time::timeout(Duration::from_secs(30), client.outbound.recv())
        .await
        .expect("channel settles");
    assert!(next.is_none());
    assert_eq!(client.connection_id, "conn-close");
}

#[tokio::test]
async fn socket_close_frame_ends_session() {
    let state = common::test_state();
    let mut client = Client::connect(&state, "conn-drop");
    client.recv().await;

    client
        .inbound
        .send(InboundFrame::Close)
        .await
        .expect("session alive");
    client.task.await.expect("session task");
    assert!(state.sessions.is_empty());
}

#[tokio::test]
async fn shutdown_ends_every_session() {
    let state = common::test_state();
    let mut first = Client::connect(&state, "conn-a");
    let mut second = Client::connect(&state, "conn-b");
    first.recv().await;
    second.recv().await;
    assert_eq!(state.sessions.len(), 2);

    state.trigger_shutdown();

    first.task.await.expect("first session");
    second.task.await.expect("second session");
    assert!(state.sessions.is_empty());
}
