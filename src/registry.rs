// ABOUTME: Adapter registry mapping adapter names to adapters and compiled operation schemas
// ABOUTME: Rejects duplicate names unless replacement is explicit; lists adapters for discovery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jsonschema::JSONSchema;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::types::{Adapter, GatewayError, OperationSpec, Violation};

/// Separator between adapter and operation in flattened tool names
pub const TOOL_NAME_SEPARATOR: &str = "__";

/// An operation declaration with its input schema compiled for validation
pub struct CompiledOperation {
    /// The declaration as provided by the adapter
    pub spec: OperationSpec,
    validator: JSONSchema,
}

impl CompiledOperation {
    fn compile(adapter: &str, spec: OperationSpec) -> Result<Self, GatewayError> {
        let validator = JSONSchema::compile(&spec.input_schema).map_err(|e| {
            GatewayError::config(format!(
                "Adapter '{adapter}' operation '{}' has an invalid input schema: {e}",
                spec.name
            ))
        })?;
        Ok(Self { spec, validator })
    }

    /// Validate arguments, collecting every violation rather than the first
    pub fn validate(&self, arguments: &Value) -> Result<(), Vec<Violation>> {
        self.validator.validate(arguments).map_err(|errors| {
            errors
                .map(|e| Violation {
                    path: e.instance_path.to_string(),
                    message: e.to_string(),
                })
                .collect()
        })
    }
}

struct AdapterEntry {
    adapter: Arc<dyn Adapter>,
    operations: HashMap<String, Arc<CompiledOperation>>,
}

impl AdapterEntry {
    fn build(adapter: Arc<dyn Adapter>) -> Result<Self, GatewayError> {
        let name = adapter.name().to_owned();
        if name.is_empty() || name.contains(TOOL_NAME_SEPARATOR) {
            return Err(GatewayError::config(format!(
                "Invalid adapter name '{name}': must be non-empty and not contain '{TOOL_NAME_SEPARATOR}'"
            )));
        }

        let mut operations = HashMap::new();
        for spec in adapter.operations() {
            let op_name = spec.name.clone();
            let compiled = CompiledOperation::compile(&name, spec)?;
            if operations.insert(op_name.clone(), Arc::new(compiled)).is_some() {
                return Err(GatewayError::config(format!(
                    "Adapter '{name}' declares operation '{op_name}' more than once"
                )));
            }
        }

        Ok(Self {
            adapter,
            operations,
        })
    }

    fn descriptor(&self) -> AdapterDescriptor {
        let mut operations: Vec<OperationSpec> = self
            .operations
            .values()
            .map(|op| op.spec.clone())
            .collect();
        operations.sort_by(|a, b| a.name.cmp(&b.name));
        AdapterDescriptor {
            name: self.adapter.name().to_owned(),
            operations,
        }
    }
}

/// Result of resolving `(adapter, operation)`
pub struct ResolvedOperation {
    /// The adapter that owns the operation
    pub adapter: Arc<dyn Adapter>,
    /// The compiled operation declaration
    pub operation: Arc<CompiledOperation>,
}

/// Discovery view of one registered adapter
#[derive(Debug, Clone, Serialize)]
pub struct AdapterDescriptor {
    /// Adapter name
    pub name: String,
    /// Declared operations, sorted by name
    pub operations: Vec<OperationSpec>,
}

/// Registry of backend adapters keyed by name
///
/// Adapters are registered at startup and looked up by name when calls
/// arrive. Reads take no global lock.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: DashMap<String, Arc<AdapterEntry>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            adapters: DashMap::new(),
        }
    }

    /// Register an adapter, failing if its name is already taken
    ///
    /// The existing registration is left untouched on failure.
    pub fn register(&self, adapter: Arc<dyn Adapter>) -> Result<(), GatewayError> {
        let entry = AdapterEntry::build(adapter)?;
        let name = entry.adapter.name().to_owned();

        match self.adapters.entry(name.clone()) {
            Entry::Occupied(_) => Err(GatewayError::duplicate_adapter(&name)),
            Entry::Vacant(slot) => {
                info!(
                    adapter = %name,
                    operations = entry.operations.len(),
                    "Registered adapter"
                );
                slot.insert(Arc::new(entry));
                Ok(())
            }
        }
    }

    /// Register an adapter, replacing any adapter with the same name
    ///
    /// Returns `true` when an existing registration was replaced.
    pub fn register_or_replace(&self, adapter: Arc<dyn Adapter>) -> Result<bool, GatewayError> {
        let entry = AdapterEntry::build(adapter)?;
        let name = entry.adapter.name().to_owned();
        let replaced = self.adapters.insert(name.clone(), Arc::new(entry)).is_some();
        info!(adapter = %name, replaced, "Registered adapter (replace allowed)");
        Ok(replaced)
    }

    /// Resolve an operation by adapter and operation name
    pub fn resolve(&self, adapter: &str, operation: &str) -> Result<ResolvedOperation, GatewayError> {
        let entry = self
            .adapters
            .get(adapter)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| GatewayError::adapter_not_found(adapter))?;

        let compiled = entry
            .operations
            .get(operation)
            .cloned()
            .ok_or_else(|| GatewayError::operation_not_found(adapter, operation))?;

        Ok(ResolvedOperation {
            adapter: Arc::clone(&entry.adapter),
            operation: compiled,
        })
    }

    /// Describe one adapter
    pub fn describe(&self, adapter: &str) -> Option<AdapterDescriptor> {
        self.adapters.get(adapter).map(|e| e.descriptor())
    }

    /// All registered adapters, sorted by name
    pub fn list(&self) -> Vec<AdapterDescriptor> {
        let mut descriptors: Vec<AdapterDescriptor> =
            self.adapters.iter().map(|e| e.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Whether an adapter is registered under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapters are registered
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Join an adapter and operation into a flattened tool name
pub fn qualified_tool_name(adapter: &str, operation: &str) -> String {
    format!("{adapter}{TOOL_NAME_SEPARATOR}{operation}")
}

/// Split a flattened tool name into `(adapter, operation)`
pub fn split_tool_name(name: &str) -> Option<(&str, &str)> {
    name.split_once(TOOL_NAME_SEPARATOR)
        .filter(|(adapter, operation)| !adapter.is_empty() && !operation.is_empty())
}
