// ABOUTME: Synchronous JSON-RPC execute endpoints routing one tool call per HTTP request
// ABOUTME: Maps dispatcher outcomes onto HTTP status codes with JSON-RPC bodies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::{json, Value};
use switchyard::protocol::{
    correlation_id_of, JsonRpcRequest, JsonRpcResponse, ToolCallParams, METHOD_NOT_FOUND,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use switchyard::{ClientIdentity, GatewayError, RequestEnvelope};
use tracing::debug;

use crate::error::{envelope_response, error_response};
use crate::state::SharedState;

/// Handle POST /api/v1/servers/{adapter}/execute
pub async fn handle_adapter(
    State(state): State<SharedState>,
    Extension(identity): Extension<Arc<ClientIdentity>>,
    Path(adapter): Path<String>,
    body: Bytes,
) -> Response {
    execute(&state, identity, Some(adapter), &body).await
}

/// Handle POST /api/v1/execute, taking the adapter from `params.adapter`
pub async fn handle(
    State(state): State<SharedState>,
    Extension(identity): Extension<Arc<ClientIdentity>>,
    body: Bytes,
) -> Response {
    execute(&state, identity, None, &body).await
}

async fn execute(
    state: &SharedState,
    identity: Arc<ClientIdentity>,
    path_adapter: Option<String>,
    body: &[u8],
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected malformed execute body");
            return error_response(
                None,
                &GatewayError::invalid_request(format!("Malformed request body: {e}")),
            );
        }
    };

    match request.method.as_str() {
        METHOD_TOOLS_CALL => tools_call(state, identity, path_adapter, request).await,
        METHOD_TOOLS_LIST => tools_list(state, &identity, path_adapter, request),
        method => {
            let resp = JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {method}"),
            );
            (StatusCode::NOT_FOUND, Json(resp)).into_response()
        }
    }
}

async fn tools_call(
    state: &SharedState,
    identity: Arc<ClientIdentity>,
    path_adapter: Option<String>,
    request: JsonRpcRequest,
) -> Response {
    let id = request.id;
    let params: ToolCallParams = match request.params.map(serde_json::from_value) {
        Some(Ok(params)) => params,
        Some(Err(e)) => {
            return error_response(
                id,
                &GatewayError::invalid_request(format!("Invalid params: {e}")),
            );
        }
        None => {
            return error_response(
                id,
                &GatewayError::invalid_request("Missing params for tools/call"),
            );
        }
    };

    let adapter = match resolve_adapter(path_adapter, params.adapter) {
        Ok(adapter) => adapter,
        Err(err) => return error_response(id, &err),
    };

    let envelope = RequestEnvelope::new(
        identity,
        adapter,
        params.name,
        params.arguments.unwrap_or_else(|| json!({})),
        id.as_ref().map(correlation_id_of),
    );
    // Echo the caller's id, or hand back the generated one
    let reply_id = id.or_else(|| Some(Value::from(envelope.correlation_id.clone())));

    let response = state.dispatcher().dispatch(envelope).await;
    envelope_response(reply_id, response)
}

fn tools_list(
    state: &SharedState,
    identity: &ClientIdentity,
    path_adapter: Option<String>,
    request: JsonRpcRequest,
) -> Response {
    let body_adapter = request
        .params
        .as_ref()
        .and_then(|p| p.get("adapter"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    let adapter = match resolve_adapter(path_adapter, body_adapter) {
        Ok(adapter) => adapter,
        Err(err) => return error_response(request.id, &err),
    };

    if let Err(err) = state.guard().authorize(identity, &adapter) {
        return error_response(request.id, &err);
    }

    match state.registry().describe(&adapter) {
        Some(descriptor) => Json(JsonRpcResponse::success(
            request.id,
            json!({ "adapter": descriptor.name, "tools": descriptor.operations }),
        ))
        .into_response(),
        None => error_response(request.id, &GatewayError::adapter_not_found(&adapter)),
    }
}

/// Pick the target adapter from the path and the body, rejecting disagreement
fn resolve_adapter(
    path_adapter: Option<String>,
    body_adapter: Option<String>,
) -> Result<String, GatewayError> {
    match (path_adapter, body_adapter) {
        (Some(path), Some(body)) if path != body => Err(GatewayError::invalid_request(format!(
            "Adapter mismatch: path names '{path}' but params name '{body}'"
        ))),
        (Some(adapter), _) | (None, Some(adapter)) => Ok(adapter),
        (None, None) => Err(GatewayError::invalid_request(
            "Missing params.adapter for /api/v1/execute",
        )),
    }
}
