// ABOUTME: Authenticated diagnostics listing adapters, their operations, and live connections
// ABOUTME: Serves GET /api/v1/servers, /api/v1/servers/{adapter}/tools, and /api/v1/connections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;
use switchyard::session::ConnectionInfo;
use switchyard::{AdapterDescriptor, ClientIdentity, GatewayError, OperationSpec};

use crate::error::error_response;
use crate::state::SharedState;

/// Response body for GET /api/v1/servers
#[derive(Debug, Serialize)]
pub struct ServerList {
    /// Adapters visible to the caller
    pub servers: Vec<AdapterDescriptor>,
}

/// Response body for GET /api/v1/servers/{adapter}/tools
#[derive(Debug, Serialize)]
pub struct ToolList {
    /// Adapter name
    pub adapter: String,
    /// Declared operations
    pub tools: Vec<OperationSpec>,
}

/// Response body for GET /api/v1/connections
#[derive(Debug, Serialize)]
pub struct ConnectionList {
    /// Number of live streaming connections
    pub count: usize,
    /// One entry per connection
    pub connections: Vec<ConnectionInfo>,
}

/// Handle GET /api/v1/servers
pub async fn list_servers(
    State(state): State<SharedState>,
    Extension(identity): Extension<Arc<ClientIdentity>>,
) -> Json<ServerList> {
    Json(ServerList {
        servers: state.dispatcher().visible_adapters(&identity),
    })
}

/// Handle GET /api/v1/servers/{adapter}/tools
///
/// 403 when the adapter is outside the caller's allow-list, 404 when unknown.
pub async fn server_tools(
    State(state): State<SharedState>,
    Extension(identity): Extension<Arc<ClientIdentity>>,
    Path(adapter): Path<String>,
) -> Response {
    if let Err(err) = state.guard().authorize(&identity, &adapter) {
        return error_response(None, &err);
    }

    match state.registry().describe(&adapter) {
        Some(descriptor) => Json(ToolList {
            adapter: descriptor.name,
            tools: descriptor.operations,
        })
        .into_response(),
        None => error_response(None, &GatewayError::adapter_not_found(&adapter)),
    }
}

/// Handle GET /api/v1/connections
pub async fn connections(State(state): State<SharedState>) -> Json<ConnectionList> {
    let connections = state.sessions.list();
    Json(ConnectionList {
        count: connections.len(),
        connections,
    })
}
