// ABOUTME: Integration tests for the switchyard-server HTTP endpoints
// ABOUTME: Exercises auth, rate limiting, dispatch status mapping, diagnostics, and /mcp via oneshot
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use switchyard_server::router;
use switchyard_server::state::SharedState;

use common::{AUTOMATION_TOKEN, CURSOR_TOKEN, LIMITED_TOKEN};

/// Build a POST request with a JSON body and optional bearer credential
fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).expect("serialize")))
        .expect("build request")
}

/// Build a GET request with an optional bearer credential
fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("build request")
}

fn tool_call(id: &str, name: &str, arguments: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

/// Send a request and parse the response body as JSON
async fn send_and_parse(state: &SharedState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router::build(state.clone())
        .oneshot(request)
        .await
        .expect("send request");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect")
        .to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_needs_no_credential() {
    let state = common::test_state();
    let (status, json) = send_and_parse(&state, get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["adapters"], 3);
    assert_eq!(json["connections"], 0);
    assert!(json["version"].is_string());
    assert!(json.get("uptimeSecs").is_some());
}

// ============================================================================
// Authentication & Authorization
// ============================================================================

#[tokio::test]
async fn missing_credential_is_401() {
    let state = common::test_state();
    let request = post_json(
        "/api/v1/servers/memory/execute",
        None,
        &tool_call("r1", "memory_list", &json!({ "project": "p" })),
    );
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["code"], -32001);
}

#[tokio::test]
async fn unknown_credential_is_401() {
    let state = common::test_state();
    let (status, json) = send_and_parse(&state, get("/api/v1/servers", Some("nope"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["data"]["kind"], "AuthenticationError");
}

#[tokio::test]
async fn disallowed_adapter_is_403() {
    let state = common::test_state();
    let request = post_json(
        "/api/v1/servers/github/execute",
        Some(CURSOR_TOKEN),
        &tool_call("r1", "create_issue", &json!({ "title": "Bug" })),
    );
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["id"], "r1");
    assert_eq!(json["error"]["code"], -32003);
    assert_eq!(json["error"]["data"]["kind"], "PermissionDeniedError");
}

#[tokio::test]
async fn quota_exhaustion_is_429_with_retry_after() {
    let state = common::test_state();

    for _ in 0..2 {
        let (status, _) = send_and_parse(&state, get("/api/v1/servers", Some(LIMITED_TOKEN))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let response = router::build(state.clone())
        .oneshot(get("/api/v1/servers", Some(LIMITED_TOKEN)))
        .await
        .expect("send request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .expect("Retry-After header");
    assert!((1..=60).contains(&retry_after));

    // Health stays reachable for a throttled caller
    let (status, _) = send_and_parse(&state, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Execute
// ============================================================================

#[tokio::test]
async fn successful_call_echoes_id() {
    let state = common::test_state();
    let request = post_json(
        "/api/v1/servers/github/execute",
        Some(AUTOMATION_TOKEN),
        &tool_call("r1", "create_issue", &json!({ "title": "Bug" })),
    );
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "r1");
    assert_eq!(json["result"]["title"], "Bug");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn call_without_id_gets_generated_correlation_id() {
    let state = common::test_state();
    let body = json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": { "name": "memory_list", "arguments": { "project": "p" } }
    });
    let request = post_json("/api/v1/servers/memory/execute", Some(AUTOMATION_TOKEN), &body);
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["id"].as_str().is_some_and(|id| id.starts_with("req-")));
    assert_eq!(json["result"]["count"], 0);
}

#[tokio::test]
async fn missing_required_field_is_400_with_violations() {
    let state = common::test_state();
    let request = post_json(
        "/api/v1/servers/github/execute",
        Some(AUTOMATION_TOKEN),
        &tool_call("r2", "create_issue", &json!({ "body": "no title" })),
    );
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], -32602);
    let violations = json["error"]["data"]["violations"]
        .as_array()
        .expect("violations");
    assert!(!violations.is_empty());
}

#[tokio::test]
async fn unknown_adapter_and_operation_are_404() {
    let state = common::test_state();

    let request = post_json(
        "/api/v1/servers/jira/execute",
        Some(AUTOMATION_TOKEN),
        &tool_call("r3", "create_ticket", &json!({})),
    );
    let (status, json) = send_and_parse(&state, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], -32004);

    let request = post_json(
        "/api/v1/servers/github/execute",
        Some(AUTOMATION_TOKEN),
        &tool_call("r4", "merge_everything", &json!({})),
    );
    let (status, json) = send_and_parse(&state, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], -32601);
}

#[tokio::test]
async fn slow_adapter_is_504() {
    let state = common::state_with_timeout(Duration::from_millis(50));
    let request = post_json(
        "/api/v1/servers/delay/execute",
        Some(AUTOMATION_TOKEN),
        &tool_call("r5", "wait", &json!({ "millis": 5000 })),
    );
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(json["error"]["code"], -32008);
}

#[tokio::test]
async fn execute_takes_adapter_from_params() {
    let state = common::test_state();
    let body = json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "tools/call",
        "params": {
            "adapter": "memory",
            "name": "memory_store",
            "arguments": { "project": "switchyard", "content": "remember this" }
        }
    });
    let (status, json) =
        send_and_parse(&state, post_json("/api/v1/execute", Some(AUTOMATION_TOKEN), &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 9);
    assert_eq!(json["result"]["project"], "switchyard");
}

#[tokio::test]
async fn adapter_mismatch_is_400() {
    let state = common::test_state();
    let body = json!({
        "jsonrpc": "2.0",
        "id": "m1",
        "method": "tools/call",
        "params": { "adapter": "github", "name": "memory_list", "arguments": { "project": "p" } }
    });
    let request = post_json("/api/v1/servers/memory/execute", Some(AUTOMATION_TOKEN), &body);
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], -32600);
}

#[tokio::test]
async fn malformed_body_is_400() {
    let state = common::test_state();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/execute")
        .header("authorization", format!("Bearer {AUTOMATION_TOKEN}"))
        .body(Body::from("{not json"))
        .expect("build request");
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], -32600);
}

#[tokio::test]
async fn unknown_method_is_404() {
    let state = common::test_state();
    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": "resources/list" });
    let request = post_json("/api/v1/servers/memory/execute", Some(AUTOMATION_TOKEN), &body);
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], -32601);
}

#[tokio::test]
async fn tools_list_method_describes_adapter() {
    let state = common::test_state();
    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" });
    let request = post_json("/api/v1/servers/github/execute", Some(AUTOMATION_TOKEN), &body);
    let (status, json) = send_and_parse(&state, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["adapter"], "github");
    assert_eq!(json["result"]["tools"][0]["name"], "create_issue");
    assert!(json["result"]["tools"][0]["inputSchema"].is_object());
}

// ============================================================================
// Diagnostics
// ============================================================================

#[tokio::test]
async fn server_list_respects_allow_list() {
    let state = common::test_state();
    let (status, json) = send_and_parse(&state, get("/api/v1/servers", Some(CURSOR_TOKEN))).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json["servers"]
        .as_array()
        .expect("servers")
        .iter()
        .filter_map(|s| s["name"].as_str())
        .collect();
    assert_eq!(names, vec!["delay", "memory"]);
}

#[tokio::test]
async fn server_tools_checks_permission_and_existence() {
    let state = common::test_state();

    let (status, _) = send_and_parse(
        &state,
        get("/api/v1/servers/github/tools", Some(CURSOR_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send_and_parse(
        &state,
        get("/api/v1/servers/jira/tools", Some(AUTOMATION_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = send_and_parse(
        &state,
        get("/api/v1/servers/memory/tools", Some(CURSOR_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["adapter"], "memory");
    assert_eq!(json["tools"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn connections_listing_is_authenticated() {
    let state = common::test_state();

    let (status, _) = send_and_parse(&state, get("/api/v1/connections", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) =
        send_and_parse(&state, get("/api/v1/connections", Some(AUTOMATION_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert_eq!(json["connections"], json!([]));
}

// ============================================================================
// Streams
// ============================================================================

#[tokio::test]
async fn events_stream_is_open_and_event_stream_typed() {
    let state = common::test_state();
    let response = router::build(state.clone())
        .oneshot(get("/api/v1/events", None))
        .await
        .expect("send request");

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}

// ============================================================================
// MCP over HTTP
// ============================================================================

#[tokio::test]
async fn mcp_lists_qualified_tools() {
    let state = common::test_state();
    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" });
    let (status, json) =
        send_and_parse(&state, post_json("/mcp", Some(CURSOR_TOKEN), &body)).await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json["result"]["tools"]
        .as_array()
        .expect("tools")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"memory__memory_store"));
    assert!(!names.iter().any(|n| n.starts_with("github__")));
}

#[tokio::test]
async fn mcp_call_to_disallowed_adapter_is_rpc_error() {
    let state = common::test_state();
    let body = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/call",
        "params": { "name": "github__create_issue", "arguments": { "title": "Bug" } }
    });
    let (status, json) =
        send_and_parse(&state, post_json("/mcp", Some(CURSOR_TOKEN), &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 2);
    assert_eq!(json["error"]["code"], -32003);
}

#[tokio::test]
async fn mcp_requires_credential() {
    let state = common::test_state();
    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" });
    let (status, _) = send_and_parse(&state, post_json("/mcp", None, &body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
