// ABOUTME: Shared server state bundling the gateway, session tracker, event bus, and shutdown signal
// ABOUTME: One instance per process, handed to every axum handler behind an Arc
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;
use std::time::{Duration, Instant};

use switchyard::{
    Adapter, AdapterRegistry, Dispatcher, Gateway, GatewayError, Guard, SessionTracker,
};
use switchyard_mcp::McpServer;
use tokio::sync::watch;
use tracing::info;

use crate::events::{EventBus, Notification};

/// Shared server state handle
pub type SharedState = Arc<GatewayState>;

/// Process-wide state behind every transport
///
/// The MCP handler mounted at `/mcp` skips its own rate charge because the
/// auth middleware already charged the request.
pub struct GatewayState {
    /// Registry, guard, and dispatcher
    pub gateway: Gateway,
    /// Live streaming connections
    pub sessions: Arc<SessionTracker>,
    /// Notification fan-out for server-push subscribers
    pub events: EventBus,
    /// MCP JSON-RPC handler for `POST /mcp`
    pub mcp: McpServer,
    shutdown: watch::Sender<bool>,
    heartbeat_interval: Duration,
    started_at: Instant,
}

impl GatewayState {
    /// Wrap an assembled gateway
    pub fn new(gateway: Gateway, heartbeat_interval: Duration) -> Self {
        let mcp = McpServer::without_rate_limit(Arc::clone(&gateway.dispatcher));
        let (shutdown, _) = watch::channel(false);
        Self {
            gateway,
            sessions: Arc::new(SessionTracker::new()),
            events: EventBus::default(),
            mcp,
            shutdown,
            heartbeat_interval,
            started_at: Instant::now(),
        }
    }

    /// The request dispatcher
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.gateway.dispatcher
    }

    /// The auth and rate-limit guard
    pub fn guard(&self) -> &Arc<Guard> {
        &self.gateway.guard
    }

    /// The adapter registry
    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.gateway.registry
    }

    /// Interval between server-push heartbeats
    pub const fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Time since the state was created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Receiver that flips to `true` once shutdown begins
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Whether shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Announce shutdown to push subscribers, then end every stream
    pub fn trigger_shutdown(&self) {
        if self.is_shutting_down() {
            return;
        }
        let delivered = self.events.publish(Notification::Shutdown);
        info!(subscribers = delivered, "Shutdown requested, closing streams");
        self.shutdown.send_replace(true);
    }

    /// Register an adapter at runtime and notify push subscribers
    pub fn register_adapter(&self, adapter: Arc<dyn Adapter>) -> Result<(), GatewayError> {
        let name = adapter.name().to_owned();
        self.registry().register(adapter)?;
        self.events
            .publish(Notification::AdapterRegistered { adapter: name });
        Ok(())
    }
}
