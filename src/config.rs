// ABOUTME: Gateway configuration: identities, rate limits, adapter settings, timeouts
// ABOUTME: Deserializable from TOML (config-file feature) with parse helpers for CLI overrides
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rate_limit::RateLimitPolicy;
use crate::secrets::DEFAULT_SECRET_TTL;
use crate::types::GatewayError;

/// Default interval between server-push heartbeat events (30 seconds)
const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Top-level gateway configuration
///
/// The adapter invocation timeout has no built-in default: it is a
/// deployment decision and must come from the config file or the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Per-call adapter timeout in seconds
    #[serde(default)]
    pub adapter_timeout_secs: Option<u64>,
    /// Interval between heartbeat events on the server-push stream
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,
    /// How long resolved secrets stay cached
    #[serde(default = "default_secret_ttl_secs")]
    pub secret_cache_ttl_secs: u64,
    /// Recognized callers
    #[serde(default)]
    pub identities: Vec<IdentityConfig>,
    /// Built-in adapter settings
    #[serde(default)]
    pub adapters: AdapterSettings,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: None,
            heartbeat_interval_secs: DEFAULT_HEARTBEAT_SECS,
            secret_cache_ttl_secs: DEFAULT_SECRET_TTL.as_secs(),
            identities: Vec::new(),
            adapters: AdapterSettings::default(),
        }
    }
}

const fn default_heartbeat_secs() -> u64 {
    DEFAULT_HEARTBEAT_SECS
}

const fn default_secret_ttl_secs() -> u64 {
    DEFAULT_SECRET_TTL.as_secs()
}

impl GatewayConfig {
    /// Adapter timeout, failing when neither config nor override supplies one
    pub fn adapter_timeout(&self, cli_override: Option<Duration>) -> Result<Duration, GatewayError> {
        match (cli_override, self.adapter_timeout_secs) {
            (Some(timeout), _) => Ok(timeout),
            (None, Some(secs)) if secs > 0 => Ok(Duration::from_secs(secs)),
            (None, Some(_)) => Err(GatewayError::config(
                "adapter_timeout_secs must be greater than zero",
            )),
            (None, None) => Err(GatewayError::config(
                "adapter_timeout_secs is required (set it in the config file or pass --adapter-timeout)",
            )),
        }
    }

    /// Heartbeat interval for the server-push stream
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Secret cache time-to-live
    pub const fn secret_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.secret_cache_ttl_secs)
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.heartbeat_interval_secs == 0 {
            return Err(GatewayError::config(
                "heartbeat_interval_secs must be greater than zero",
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for identity in &self.identities {
            if identity.id.trim().is_empty() {
                return Err(GatewayError::config("identity id must not be empty"));
            }
            if !seen.insert(identity.id.as_str()) {
                return Err(GatewayError::config(format!(
                    "duplicate identity id: {}",
                    identity.id
                )));
            }
            if let Some(limit) = &identity.rate_limit {
                limit.to_policy().map_err(|e| {
                    GatewayError::config(format!("identity '{}': {}", identity.id, e.message))
                })?;
            }
        }
        Ok(())
    }
}

/// One recognized caller as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Unique identity id (e.g., `cursor`, `desktop-assistant`)
    pub id: String,
    /// Human-readable name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Secret reference for the bearer credential (`env:`, `file:`, or literal)
    pub credential: String,
    /// Adapters this identity may reach; empty means all
    #[serde(default)]
    pub allowed_adapters: Vec<String>,
    /// Optional request quota
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Request quota as written in the config file
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub requests: u32,
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

const fn default_window_secs() -> u64 {
    60
}

impl RateLimitConfig {
    /// Convert to a runtime policy, rejecting degenerate values
    pub fn to_policy(&self) -> Result<RateLimitPolicy, GatewayError> {
        if self.requests == 0 {
            return Err(GatewayError::config("rate_limit.requests must be greater than zero"));
        }
        if self.window_secs == 0 {
            return Err(GatewayError::config("rate_limit.window_secs must be greater than zero"));
        }
        Ok(RateLimitPolicy::new(
            self.requests,
            Duration::from_secs(self.window_secs),
        ))
    }
}

/// Settings for the adapters bundled with the gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterSettings {
    /// Read-only filesystem adapter
    #[serde(default)]
    pub filesystem: Option<FilesystemSettings>,
    /// In-memory notes adapter
    #[serde(default)]
    pub memory: Option<MemorySettings>,
}

/// Filesystem adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemSettings {
    /// Directory every path is resolved against
    pub root: PathBuf,
}

/// Memory adapter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Whether to register the adapter
    #[serde(default = "default_true")]
    pub enabled: bool,
}

const fn default_true() -> bool {
    true
}

/// Default config file location: `<config dir>/switchyard/gateway.toml`
#[cfg(feature = "config-file")]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("switchyard").join("gateway.toml"))
}

/// Parse a gateway config from TOML text
#[cfg(feature = "config-file")]
pub fn parse_config(input: &str) -> Result<GatewayConfig, GatewayError> {
    let config: GatewayConfig = toml::from_str(input)
        .map_err(|e| GatewayError::config(format!("Invalid gateway config: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a gateway config file
#[cfg(feature = "config-file")]
pub async fn load_config(path: &std::path::Path) -> Result<GatewayConfig, GatewayError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        GatewayError::config(format!("Failed to read config {}: {e}", path.display()))
    })?;
    parse_config(&text)
}

/// Parse a timeout value from a string (in seconds)
///
/// # Errors
///
/// Returns an error if the string cannot be parsed as a `u64`.
pub fn parse_timeout(input: &str) -> Result<Duration, ParseIntError> {
    input.trim().parse::<u64>().map(Duration::from_secs)
}
