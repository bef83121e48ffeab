// ABOUTME: Built-in adapters bundled with the gateway and their config-driven registration
// ABOUTME: Provides the in-memory notes adapter and the read-only rooted filesystem adapter
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod filesystem;
pub mod memory;

use std::sync::Arc;

use tracing::info;

pub use filesystem::FilesystemAdapter;
pub use memory::MemoryAdapter;

use crate::config::AdapterSettings;
use crate::registry::AdapterRegistry;
use crate::types::GatewayError;

/// Register the built-in adapters enabled by `settings`
///
/// Returns the names of the adapters that were registered.
pub async fn register_builtin(
    registry: &AdapterRegistry,
    settings: &AdapterSettings,
) -> Result<Vec<String>, GatewayError> {
    let mut registered = Vec::new();

    if settings.memory.as_ref().is_some_and(|m| m.enabled) {
        let adapter = Arc::new(MemoryAdapter::new());
        registry.register(adapter)?;
        registered.push(memory::ADAPTER_NAME.to_owned());
    }

    if let Some(fs) = &settings.filesystem {
        let adapter = Arc::new(FilesystemAdapter::new(&fs.root).await?);
        registry.register(adapter)?;
        registered.push(filesystem::ADAPTER_NAME.to_owned());
    }

    info!(adapters = ?registered, "Built-in adapters registered");
    Ok(registered)
}
