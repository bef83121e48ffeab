// ABOUTME: WebSocket message envelope shared by client and server frames
// ABOUTME: Parses client commands and builds status, tool_response, tool_list, error, and pong frames
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use switchyard::protocol::correlation_id_of;
use switchyard::{AdapterDescriptor, GatewayError};

/// Reserved message type constants
pub mod msg_types {
    /// Client credential presentation
    pub const AUTH: &str = "auth";
    /// Client adapter operation request
    pub const TOOL_CALL: &str = "tool_call";
    /// Client request for visible adapters
    pub const LIST_TOOLS: &str = "list_tools";
    /// Client liveness probe
    pub const PING: &str = "ping";
    /// Client-initiated close
    pub const CLOSE: &str = "close";
    /// Connection state change
    pub const STATUS: &str = "status";
    /// Result of a `tool_call`
    pub const TOOL_RESPONSE: &str = "tool_response";
    /// Result of a `list_tools`
    pub const TOOL_LIST: &str = "tool_list";
    /// Failure report
    pub const ERROR: &str = "error";
    /// Answer to `ping`
    pub const PONG: &str = "pong";
}

/// Error codes that have no gateway error kind behind them
pub mod codes {
    /// Non-auth message before authentication
    pub const AUTH_REQUIRED: &str = "auth_required";
    /// Unparseable or unknown frame
    pub const INVALID_MESSAGE: &str = "invalid_message";
}

/// Client -> server envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientMessage {
    /// Message type
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Client-chosen correlation id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Type-specific payload
    #[serde(default)]
    pub data: Value,
    /// Client timestamp, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

/// A parsed client request
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Present a bearer credential
    Auth {
        /// Credential
        token: String,
    },
    /// Invoke an adapter operation
    ToolCall {
        /// Target adapter
        server_id: String,
        /// Operation name
        tool_name: String,
        /// Operation arguments
        params: Value,
    },
    /// List adapters visible to the identity
    ListTools,
    /// Liveness probe
    Ping,
    /// End the session
    Close,
}

#[derive(Deserialize)]
struct AuthData {
    token: String,
}

#[derive(Deserialize)]
struct ToolCallData {
    #[serde(rename = "serverId")]
    server_id: String,
    #[serde(rename = "toolName")]
    tool_name: String,
    #[serde(default)]
    params: Option<Value>,
}

impl ClientMessage {
    /// The message id rendered as a correlation id
    pub fn correlation_id(&self) -> Option<String> {
        self.id.as_ref().map(correlation_id_of)
    }

    /// Interpret the envelope as a typed command
    pub fn command(&self) -> Result<ClientCommand, GatewayError> {
        match self.msg_type.as_str() {
            msg_types::AUTH => {
                let data: AuthData = self.payload()?;
                Ok(ClientCommand::Auth { token: data.token })
            }
            msg_types::TOOL_CALL => {
                let data: ToolCallData = self.payload()?;
                Ok(ClientCommand::ToolCall {
                    server_id: data.server_id,
                    tool_name: data.tool_name,
                    params: match data.params {
                        Some(Value::Null) | None => json!({}),
                        Some(params) => params,
                    },
                })
            }
            msg_types::LIST_TOOLS => Ok(ClientCommand::ListTools),
            msg_types::PING => Ok(ClientCommand::Ping),
            msg_types::CLOSE => Ok(ClientCommand::Close),
            other => Err(GatewayError::invalid_request(format!(
                "Unknown message type: {other}"
            ))),
        }
    }

    fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, GatewayError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            GatewayError::invalid_request(format!("Invalid {} payload: {e}", self.msg_type))
        })
    }
}

/// Server -> client envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerMessage {
    /// Message type
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Correlation id of the client message this answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Type-specific payload
    pub data: Value,
    /// Emission time
    pub timestamp: DateTime<Utc>,
}

impl ServerMessage {
    /// Create a message stamped with the current time
    pub fn new(msg_type: &str, id: Option<String>, data: Value) -> Self {
        Self {
            msg_type: msg_type.to_owned(),
            id,
            data,
            timestamp: Utc::now(),
        }
    }

    /// First frame on every connection
    pub fn auth_required(connection_id: &str) -> Self {
        Self::new(
            msg_types::STATUS,
            None,
            json!({ "state": "auth_required", "connectionId": connection_id }),
        )
    }

    /// Sent after a successful `auth`
    pub fn authenticated(id: Option<String>, connection_id: &str, identity: &str) -> Self {
        Self::new(
            msg_types::STATUS,
            id,
            json!({
                "state": "authenticated",
                "connectionId": connection_id,
                "identity": identity,
            }),
        )
    }

    /// Successful `tool_call` result
    pub fn tool_response(id: String, server_id: &str, tool_name: &str, result: Value) -> Self {
        Self::new(
            msg_types::TOOL_RESPONSE,
            Some(id),
            json!({ "serverId": server_id, "toolName": tool_name, "result": result }),
        )
    }

    /// Adapters visible to the caller
    pub fn tool_list(id: Option<String>, servers: &[AdapterDescriptor]) -> Self {
        Self::new(msg_types::TOOL_LIST, id, json!({ "servers": servers }))
    }

    /// Error frame with a stream code
    pub fn error(id: Option<String>, code: &str, message: impl Into<String>, details: Option<Value>) -> Self {
        let mut data = json!({ "code": code, "message": message.into() });
        if let (Some(details), Value::Object(map)) = (details, &mut data) {
            map.insert("details".to_owned(), details);
        }
        Self::new(msg_types::ERROR, id, data)
    }

    /// Error frame for a gateway error
    pub fn from_gateway_error(id: Option<String>, err: &GatewayError) -> Self {
        Self::error(id, err.kind.stream_code(), err.message.clone(), err.data.clone())
    }

    /// Answer to `ping`
    pub fn pong(id: Option<String>) -> Self {
        Self::new(msg_types::PONG, id, Value::Null)
    }

    /// Value of `data.code` on error frames
    pub fn error_code(&self) -> Option<&str> {
        (self.msg_type == msg_types::ERROR)
            .then(|| self.data.get("code").and_then(Value::as_str))
            .flatten()
    }
}
