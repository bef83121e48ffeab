// ABOUTME: GET /health liveness handler reporting version, uptime, and gateway counters
// ABOUTME: Unauthenticated and never rate limited
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::SharedState;

/// Response body for GET /health
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `ok` while the process is serving
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Seconds since startup
    pub uptime_secs: u64,
    /// Registered adapters
    pub adapters: usize,
    /// Live streaming connections
    pub connections: usize,
}

/// Handle GET /health
pub async fn handle(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime().as_secs(),
        adapters: state.registry().len(),
        connections: state.sessions.len(),
    })
}
