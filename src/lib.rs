// ABOUTME: MCP gateway core library routing authenticated tool calls to pluggable backend adapters
// ABOUTME: Re-exports the registry, guard, dispatcher, session tracker, and built-in adapters
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Switchyard: MCP Gateway Core
//!
//! A single entry point that sits between AI clients (IDE assistants, desktop
//! assistants, automation scripts) and many backend tool servers. Each backend
//! is wrapped in an [`Adapter`](types::Adapter), registered by name in the
//! [`AdapterRegistry`], and reached through the [`Dispatcher`], which checks
//! the caller's allow-list, validates arguments against the operation's JSON
//! Schema, and bounds every invocation with a timeout.
//!
//! Transports (HTTP, WebSocket, SSE, MCP stdio) live in the
//! `switchyard-server` and `switchyard-mcp` crates and share everything here.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use serde_json::json;
//! use switchyard::{AdapterRegistry, ClientIdentity, Dispatcher, Guard, MemoryAdapter, RequestEnvelope};
//!
//! # async fn example() -> Result<(), switchyard::GatewayError> {
//! let registry = Arc::new(AdapterRegistry::new());
//! registry.register(Arc::new(MemoryAdapter::new()))?;
//!
//! let guard = Arc::new(Guard::new(vec![ClientIdentity::new("cli", "CLI", "secret")])?);
//! let identity = guard.authenticate("secret")?;
//! guard.check_rate(&identity)?;
//!
//! let dispatcher = Dispatcher::new(registry, guard, Duration::from_secs(30));
//! let request = RequestEnvelope::new(
//!     identity,
//!     "memory",
//!     "memory_list",
//!     json!({ "project": "switchyard" }),
//!     None,
//! );
//! let response = dispatcher.dispatch(request).await;
//! println!("{}", serde_json::to_string(&response).unwrap_or_default());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: `Adapter` trait, operation specs, error taxonomy
//! - [`protocol`]: JSON-RPC wire envelope and error codes
//! - [`envelope`]: request/response envelopes handled by the dispatcher
//! - [`registry`]: adapter registry with compiled input schemas
//! - [`auth`]: client identities and the auth/rate-limit guard
//! - [`rate_limit`]: fixed-window per-identity counters
//! - [`dispatcher`]: authorize, validate, invoke with timeout
//! - [`session`]: connection tracking for streaming transports
//! - [`secrets`]: secret reference resolution with TTL cache
//! - [`config`]: gateway configuration
//! - [`gateway`]: startup wiring shared by the binaries
//! - [`adapters`]: built-in `memory` and `filesystem` adapters

/// Core types: adapter trait, operation specs, and errors
pub mod types;

/// Built-in adapters
pub mod adapters;
/// Client identities and the authentication guard
pub mod auth;
/// Gateway configuration
pub mod config;
/// Request dispatch pipeline
pub mod dispatcher;
/// Request and response envelopes
pub mod envelope;
/// Startup wiring from configuration
pub mod gateway;
/// JSON-RPC wire types
pub mod protocol;
/// Per-identity rate limiting
pub mod rate_limit;
/// Adapter registry
pub mod registry;
/// Secret reference resolution
pub mod secrets;
/// Streaming connection tracker
pub mod session;

pub use adapters::{register_builtin, FilesystemAdapter, MemoryAdapter};
pub use auth::{ClientIdentity, Guard};
pub use config::GatewayConfig;
pub use dispatcher::Dispatcher;
pub use envelope::{RequestEnvelope, ResponseEnvelope};
pub use gateway::Gateway;
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use registry::{AdapterDescriptor, AdapterRegistry};
pub use secrets::SecretResolver;
pub use session::{ConnectionInfo, SessionTracker};
pub use types::{Adapter, AdapterError, ErrorKind, GatewayError, OperationSpec};
