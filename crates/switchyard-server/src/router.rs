// ABOUTME: Axum router wiring the synchronous, streaming, diagnostics, and MCP endpoints
// ABOUTME: Applies bearer auth and rate limiting to protected routes only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth;
use crate::diagnostics;
use crate::events;
use crate::execute;
use crate::health;
use crate::mcp_http;
use crate::state::SharedState;
use crate::ws;

/// Build the application router with all endpoints
///
/// Protected routes (bearer credential, one rate-limit unit per request):
/// - `POST /api/v1/servers/{adapter}/execute`: JSON-RPC call against one adapter
/// - `POST /api/v1/execute`: JSON-RPC call naming the adapter in `params.adapter`
/// - `GET /api/v1/servers`: adapters visible to the caller
/// - `GET /api/v1/servers/{adapter}/tools`: one adapter's operations
/// - `GET /api/v1/connections`: live streaming connections
/// - `POST /mcp`: aggregated MCP server
///
/// Open routes:
/// - `GET /health`: liveness
/// - `GET /api/v1/events`: server-push stream
/// - `GET /ws`: bidirectional stream, authenticated in-band
pub fn build(state: SharedState) -> Router {
    let protected = Router::new()
        .route(
            "/api/v1/servers/{adapter}/execute",
            post(execute::handle_adapter),
        )
        .route("/api/v1/execute", post(execute::handle))
        .route("/api/v1/servers", get(diagnostics::list_servers))
        .route(
            "/api/v1/servers/{adapter}/tools",
            get(diagnostics::server_tools),
        )
        .route("/api/v1/connections", get(diagnostics::connections))
        .route("/mcp", post(mcp_http::handle))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_identity,
        ));

    Router::new()
        .merge(protected)
        .route("/health", get(health::handle))
        .route("/api/v1/events", get(events::handle))
        .route("/ws", get(ws::handle))
        .with_state(state)
}
