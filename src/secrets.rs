// ABOUTME: Secret reference resolution with a memoized time-to-live cache
// ABOUTME: Resolves env:NAME and file:PATH references; other values are treated as literals
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::types::GatewayError;

/// Default time a resolved secret stays cached (5 minutes)
pub const DEFAULT_SECRET_TTL: Duration = Duration::from_secs(300);

const ENV_PREFIX: &str = "env:";
const FILE_PREFIX: &str = "file:";

#[derive(Debug, Clone)]
struct CachedSecret {
    value: String,
    resolved_at: Instant,
}

/// Resolves secret references and memoizes the results for a fixed TTL
///
/// Values are never logged; only the reference kind appears in debug output.
#[derive(Debug)]
pub struct SecretResolver {
    ttl: Duration,
    cache: DashMap<String, CachedSecret>,
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SECRET_TTL)
    }
}

impl SecretResolver {
    /// Create a resolver caching each secret for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: DashMap::new(),
        }
    }

    /// Resolve a reference to its secret value
    ///
    /// - `env:NAME` reads the environment variable `NAME`
    /// - `file:PATH` reads the file at `PATH`, trimming surrounding whitespace
    /// - anything else is returned as-is
    pub async fn resolve(&self, reference: &str) -> Result<String, GatewayError> {
        if let Some(cached) = self.cache.get(reference) {
            if cached.resolved_at.elapsed() < self.ttl {
                return Ok(cached.value.clone());
            }
        }

        let value = fetch(reference).await?;
        self.cache.insert(
            reference.to_owned(),
            CachedSecret {
                value: value.clone(),
                resolved_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Drop a cached entry so the next `resolve` re-reads the source
    pub fn invalidate(&self, reference: &str) {
        self.cache.remove(reference);
    }
}

async fn fetch(reference: &str) -> Result<String, GatewayError> {
    if let Some(name) = reference.strip_prefix(ENV_PREFIX) {
        debug!(variable = name, "Resolving secret from environment");
        return std::env::var(name)
            .map_err(|_| GatewayError::config(format!("Secret environment variable not set: {name}")));
    }

    if let Some(path) = reference.strip_prefix(FILE_PREFIX) {
        debug!(path, "Resolving secret from file");
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GatewayError::config(format!("Failed to read secret file {path}: {e}")))?;
        return Ok(contents.trim().to_owned());
    }

    Ok(reference.to_owned())
}
