// ABOUTME: Shared fixtures for server integration tests: stub adapters and a wired gateway state
// ABOUTME: Provides identities with allow-lists and quotas matching the test scenarios
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use switchyard::{
    Adapter, AdapterError, AdapterRegistry, ClientIdentity, Gateway, Guard, MemoryAdapter,
    OperationSpec, RateLimitPolicy,
};
use switchyard_server::state::{GatewayState, SharedState};

pub const AUTOMATION_TOKEN: &str = "automation-token";
pub const CURSOR_TOKEN: &str = "cursor-token";
pub const LIMITED_TOKEN: &str = "limited-token";

/// Issue tracker stand-in with one schema-checked operation
pub struct GithubStub;

#[async_trait]
impl Adapter for GithubStub {
    fn name(&self) -> &str {
        "github"
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new(
            "create_issue",
            "Open an issue",
            json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "body": { "type": "string" }
                },
                "required": ["title"]
            }),
        )]
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, AdapterError> {
        match operation {
            "create_issue" => Ok(json!({ "number": 1, "title": arguments["title"] })),
            other => Err(AdapterError::unknown_operation(other)),
        }
    }
}

/// Adapter that answers after a caller-chosen delay
pub struct DelayAdapter;

#[async_trait]
impl Adapter for DelayAdapter {
    fn name(&self) -> &str {
        "delay"
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![OperationSpec::new(
            "wait",
            "Sleep, then echo the label",
            json!({
                "type": "object",
                "properties": {
                    "millis": { "type": "integer", "minimum": 0 },
                    "label": { "type": "string" }
                },
                "required": ["millis"]
            }),
        )]
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, AdapterError> {
        if operation != "wait" {
            return Err(AdapterError::unknown_operation(operation));
        }
        let millis = arguments["millis"].as_u64().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(json!({ "label": arguments["label"] }))
    }
}

/// Gateway with memory, github, and delay adapters
pub fn test_gateway(timeout: Duration) -> Gateway {
    let registry = Arc::new(AdapterRegistry::new());
    registry
        .register(Arc::new(MemoryAdapter::new()))
        .expect("register memory");
    registry
        .register(Arc::new(GithubStub))
        .expect("register github");
    registry
        .register(Arc::new(DelayAdapter))
        .expect("register delay");

    let guard = Guard::new(vec![
        ClientIdentity::new("automation-script", "Automation", AUTOMATION_TOKEN),
        ClientIdentity::new("cursor-ide", "Cursor IDE", CURSOR_TOKEN)
            .with_allowed_adapters(["memory", "delay"]),
        ClientIdentity::new("limited-bot", "Limited", LIMITED_TOKEN)
            .with_rate_limit(RateLimitPolicy::per_minute(2)),
    ])
    .expect("guard");

    Gateway::new(registry, Arc::new(guard), timeout)
}

/// Server state around [`test_gateway`] with a 5 second adapter timeout
pub fn test_state() -> SharedState {
    state_with_timeout(Duration::from_secs(5))
}

/// Server state with a custom adapter timeout
pub fn state_with_timeout(timeout: Duration) -> SharedState {
    Arc::new(GatewayState::new(
        test_gateway(timeout),
        Duration::from_secs(30),
    ))
}
