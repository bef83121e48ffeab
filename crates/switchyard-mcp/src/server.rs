// ABOUTME: MCP server core that routes JSON-RPC requests to the gateway dispatcher
// ABOUTME: Implements initialize, tools/list, tools/call, and ping over every registered adapter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use serde_json::Value;
use switchyard::protocol::correlation_id_of;
use switchyard::registry::{qualified_tool_name, split_tool_name};
use switchyard::{ClientIdentity, Dispatcher, RequestEnvelope};
use tracing::debug;

use crate::protocol::{
    CallToolResult, InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolDefinition, ToolsCapability,
    ToolsListResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION,
};

/// MCP server that exposes every adapter operation as a tool
///
/// Each request is handled on behalf of an already-authenticated identity:
/// the stdio binary binds one identity at startup, the HTTP mount resolves
/// it from the bearer credential. Transport layers feed parsed requests into
/// `handle_request` and send the returned responses.
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    charge_rate_limit: bool,
}

impl McpServer {
    /// Create a server that charges the identity's rate limit on every `tools/call`
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            charge_rate_limit: true,
        }
    }

    /// Create a server for transports that already charged the rate limit upstream
    pub const fn without_rate_limit(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            charge_rate_limit: false,
        }
    }

    /// Route a JSON-RPC request to the appropriate MCP handler
    ///
    /// Returns `None` for notifications (requests without an id).
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        identity: &Arc<ClientIdentity>,
    ) -> Option<JsonRpcResponse> {
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                format!("Unsupported JSON-RPC version: {}", request.jsonrpc),
            ));
        }

        // Notifications have no id and expect no response
        if request.id.is_none() {
            debug!(method = %request.method, "Received notification, no response");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => Self::handle_initialize(request.id, request.params),
            "tools/list" => self.handle_tools_list(request.id, identity),
            "tools/call" => {
                self.handle_tools_call(request.id, request.params, identity)
                    .await
            }
            "ping" => JsonRpcResponse::success(request.id, Value::Object(serde_json::Map::new())),
            method => {
                debug!(method, "Unknown MCP method");
                JsonRpcResponse::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Method not found: {method}"),
                )
            }
        };

        Some(response)
    }

    /// Handle `initialize`: log client info and return server capabilities
    fn handle_initialize(id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        if let Some(params) = params {
            if let Ok(init) = serde_json::from_value::<InitializeParams>(params) {
                debug!(
                    client = %init.client_info.name,
                    version = ?init.client_info.version,
                    protocol = %init.protocol_version,
                    capabilities = %init.capabilities,
                    "MCP client connected"
                );
            }
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_owned(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_owned(),
                version: SERVER_VERSION.to_owned(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {e}"))
            }
        }
    }

    /// Handle `tools/list`: flatten the operations of every adapter the identity may reach
    fn handle_tools_list(&self, id: Option<Value>, identity: &ClientIdentity) -> JsonRpcResponse {
        let tools = self
            .dispatcher
            .visible_adapters(identity)
            .into_iter()
            .flat_map(|adapter| {
                adapter
                    .operations
                    .into_iter()
                    .map(move |op| ToolDefinition {
                        name: qualified_tool_name(&adapter.name, &op.name),
                        description: format!("[{}] {}", adapter.name, op.description),
                        input_schema: op.input_schema,
                    })
            })
            .collect();

        match serde_json::to_value(ToolsListResult { tools }) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                JsonRpcResponse::error(id, INTERNAL_ERROR, format!("Serialization error: {e}"))
            }
        }
    }

    /// Handle `tools/call`: resolve the tool name and dispatch through the gateway
    async fn handle_tools_call(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        identity: &Arc<ClientIdentity>,
    ) -> JsonRpcResponse {
        let call_params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(cp) => cp,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid params: {e}"),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    "Missing params for tools/call".to_owned(),
                );
            }
        };

        let (adapter, operation) = match call_params.adapter.as_deref() {
            Some(adapter) => (adapter.to_owned(), call_params.name.clone()),
            None => match split_tool_name(&call_params.name) {
                Some((adapter, operation)) => (adapter.to_owned(), operation.to_owned()),
                None => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!(
                            "Tool name must be '{{adapter}}__{{operation}}': {}",
                            call_params.name
                        ),
                    );
                }
            },
        };

        if self.charge_rate_limit {
            if let Err(err) = self.dispatcher.guard().check_rate(identity) {
                return JsonRpcResponse::from_error(id, &err);
            }
        }

        let arguments = call_params
            .arguments
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let correlation_id = id.as_ref().map(correlation_id_of);
        let envelope = RequestEnvelope::new(
            Arc::clone(identity),
            adapter,
            operation,
            arguments,
            correlation_id,
        );

        let response = self.dispatcher.dispatch(envelope).await;
        match response.outcome {
            Ok(result) => match serde_json::to_value(CallToolResult::json(&result)) {
                Ok(val) => JsonRpcResponse::success(id, val),
                Err(e) => JsonRpcResponse::error(
                    id,
                    INTERNAL_ERROR,
                    format!("Result serialization error: {e}"),
                ),
            },
            Err(err) => JsonRpcResponse::from_error(id, &err),
        }
    }
}
