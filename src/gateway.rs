// ABOUTME: Startup wiring that builds the registry, guard, and dispatcher from gateway config
// ABOUTME: Shared by the HTTP server and stdio MCP binaries so both enforce identical policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::adapters::register_builtin;
use crate::auth::Guard;
use crate::config::GatewayConfig;
use crate::dispatcher::Dispatcher;
use crate::registry::AdapterRegistry;
use crate::secrets::SecretResolver;
use crate::types::GatewayError;

/// The long-lived components every transport shares
#[derive(Clone)]
pub struct Gateway {
    /// Registered adapters
    pub registry: Arc<AdapterRegistry>,
    /// Identity table and rate limiter
    pub guard: Arc<Guard>,
    /// Dispatch pipeline over `registry` and `guard`
    pub dispatcher: Arc<Dispatcher>,
}

impl Gateway {
    /// Assemble a gateway from already-built parts
    pub fn new(registry: Arc<AdapterRegistry>, guard: Arc<Guard>, timeout: Duration) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&guard),
            timeout,
        ));
        Self {
            registry,
            guard,
            dispatcher,
        }
    }

    /// Build a gateway from configuration
    ///
    /// Resolves identity credentials, registers the enabled built-in
    /// adapters, and fails when no adapter timeout is configured.
    pub async fn from_config(
        config: &GatewayConfig,
        timeout_override: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        config.validate()?;
        let timeout = config.adapter_timeout(timeout_override)?;

        let secrets = SecretResolver::new(config.secret_cache_ttl());
        let guard = Arc::new(Guard::from_config(&config.identities, &secrets).await?);

        let registry = Arc::new(AdapterRegistry::new());
        register_builtin(&registry, &config.adapters).await?;

        info!(
            identities = guard.identity_count(),
            adapters = registry.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Gateway assembled"
        );

        Ok(Self::new(registry, guard, timeout))
    }
}
