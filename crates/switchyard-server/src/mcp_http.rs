// ABOUTME: MCP Streamable HTTP endpoint mounting the aggregated MCP server at POST /mcp
// ABOUTME: Answers with JSON or a single SSE event depending on the Accept header
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::ACCEPT;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures::stream;
use switchyard::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use switchyard::ClientIdentity;
use tracing::{debug, error};

use crate::state::SharedState;

/// Handle POST /mcp
///
/// The bearer credential picks the identity; the auth middleware has already
/// charged its rate limit for this request.
pub async fn handle(
    State(state): State<SharedState>,
    Extension(identity): Extension<Arc<ClientIdentity>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse HTTP JSON-RPC body");
            let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
            return Json(resp).into_response();
        }
    };

    debug!(method = %request.method, identity = %identity.id, "Handling HTTP MCP request");

    let Some(response) = state.mcp.handle_request(request, &identity).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    let wants_sse = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"));

    if wants_sse {
        respond_sse(&response)
    } else {
        Json(response).into_response()
    }
}

/// Wrap a JSON-RPC response in a single SSE event
fn respond_sse(response: &JsonRpcResponse) -> Response {
    let data = serde_json::to_string(response).unwrap_or_else(|e| {
        format!(
            r#"{{"jsonrpc":"2.0","error":{{"code":-32603,"message":"Serialization failed: {e}"}}}}"#
        )
    });

    let event = Event::default().event("message").data(data);
    let event_stream = stream::once(async { Ok::<_, Infallible>(event) });

    Sse::new(event_stream).into_response()
}
