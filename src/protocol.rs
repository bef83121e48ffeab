// ABOUTME: Transport-independent JSON-RPC wire envelope shared by every gateway transport
// ABOUTME: Defines request/response shapes, tool-call params, and the stable numeric error codes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::ResponseEnvelope;
use crate::types::GatewayError;

/// Method name for invoking an adapter operation
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Method name for listing operations
pub const METHOD_TOOLS_LIST: &str = "tools/list";

// ============================================================================
// JSON-RPC Error Codes
// ============================================================================

/// JSON-RPC parse error: invalid JSON received
pub const PARSE_ERROR: i32 = -32_700;

/// JSON-RPC invalid request
pub const INVALID_REQUEST: i32 = -32_600;

/// JSON-RPC method not found (also used for unknown adapter operations)
pub const METHOD_NOT_FOUND: i32 = -32_601;

/// JSON-RPC invalid parameters (schema validation failures)
pub const INVALID_PARAMS: i32 = -32_602;

/// JSON-RPC internal error
pub const INTERNAL_ERROR: i32 = -32_603;

/// Adapter invocation failed
pub const ADAPTER_ERROR: i32 = -32_000;

/// Missing or invalid credential
pub const AUTHENTICATION_ERROR: i32 = -32_001;

/// Identity not permitted to reach the adapter
pub const PERMISSION_DENIED: i32 = -32_003;

/// No adapter registered under the requested name
pub const ADAPTER_NOT_FOUND: i32 = -32_004;

/// Adapter did not answer within the configured timeout
pub const ADAPTER_TIMEOUT: i32 = -32_008;

/// Correlation id already in flight
pub const DUPLICATE_REQUEST: i32 = -32_009;

/// Adapter name already registered
pub const DUPLICATE_ADAPTER: i32 = -32_010;

/// Identity exceeded its request quota
pub const RATE_LIMITED: i32 = -32_029;

// ============================================================================
// Envelope
// ============================================================================

fn default_jsonrpc() -> String {
    "2.0".to_owned()
}

/// Incoming request envelope
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version marker; optional on the gateway's own HTTP API
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    /// Request identifier (None for notifications)
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Option<Value>,
}

/// Outgoing response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Matching request identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Success payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Error object inside a response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Stable numeric error code
    pub code: i32,
    /// Message safe to display
    pub message: String,
    /// Structured detail (violations, retry hints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Convert a gateway error into its wire form
    pub fn from_gateway(err: &GatewayError) -> Self {
        let mut data = err.data.clone().unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        if let Value::Object(map) = &mut data {
            map.insert("kind".to_owned(), Value::from(err.kind.name()));
        }
        Self {
            code: err.kind.rpc_code(),
            message: err.message.clone(),
            data: Some(data),
        }
    }
}

impl JsonRpcResponse {
    /// Build a success response with the given result
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response with the given code and message
    pub fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message,
                data: None,
            }),
        }
    }

    /// Build an error response from a gateway error
    pub fn from_error(id: Option<Value>, err: &GatewayError) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(JsonRpcError::from_gateway(err)),
        }
    }

    /// Map a dispatcher response envelope onto the wire, echoing the caller's id
    pub fn from_envelope(id: Option<Value>, envelope: ResponseEnvelope) -> Self {
        match envelope.outcome {
            Ok(result) => Self::success(id, result),
            Err(err) => Self::from_error(id, &err),
        }
    }
}

/// Parameters of a `tools/call` request
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Target adapter (optional when the transport carries it elsewhere)
    #[serde(default)]
    pub adapter: Option<String>,
    /// Operation name
    pub name: String,
    /// Operation arguments
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Render a request id as a correlation id string
///
/// String ids are used verbatim; numeric and other ids use their JSON text.
pub fn correlation_id_of(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
