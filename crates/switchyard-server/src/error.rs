// ABOUTME: Maps gateway error kinds onto HTTP status codes for the synchronous transport
// ABOUTME: Renders failures as JSON-RPC error bodies with Retry-After on rate limiting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use switchyard::protocol::JsonRpcResponse;
use switchyard::{ErrorKind, GatewayError, ResponseEnvelope};

/// HTTP status for an error kind
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorKind::AdapterNotFound | ErrorKind::OperationNotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArguments | ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::AdapterTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::DuplicateAdapter | ErrorKind::DuplicateRequest => StatusCode::CONFLICT,
        ErrorKind::AdapterExecution | ErrorKind::Config | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Build an error response carrying a JSON-RPC error body
pub fn error_response(id: Option<Value>, err: &GatewayError) -> Response {
    with_error_status(JsonRpcResponse::from_error(id, err), Some(err))
}

/// Render a dispatcher outcome: 200 on success, the error's status otherwise
pub fn envelope_response(id: Option<Value>, envelope: ResponseEnvelope) -> Response {
    let err = envelope.error().cloned();
    with_error_status(JsonRpcResponse::from_envelope(id, envelope), err.as_ref())
}

fn with_error_status(body: JsonRpcResponse, err: Option<&GatewayError>) -> Response {
    let status = err.map_or(StatusCode::OK, |e| status_for(e.kind));
    let mut response = (status, Json(body)).into_response();

    if let Some(secs) = err.and_then(GatewayError::retry_after_secs) {
        if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
    }

    response
}
