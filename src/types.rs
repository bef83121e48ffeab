// ABOUTME: Core gateway types: error taxonomy, adapter capability trait, operation specs
// ABOUTME: Every backend adapter implements the Adapter trait; every failure is a GatewayError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

//! # Core Types
//!
//! Self-contained definitions shared by every layer of the gateway: the
//! [`Adapter`] capability interface implemented by backend integrations, the
//! [`OperationSpec`] they declare, and the [`GatewayError`] taxonomy used by
//! the guard, registry, dispatcher, and transports.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol;

// ============================================================================
// Error Type
// ============================================================================

/// Error type for gateway operations
///
/// Carries a stable [`ErrorKind`], a message safe to show to clients, and
/// optional structured detail (validation violations, retry hints).
#[derive(Debug, Clone)]
pub struct GatewayError {
    /// Error category
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
    /// Structured detail for programmatic handling
    pub data: Option<Value>,
}

/// Categories of errors produced by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or unrecognized credential
    #[serde(rename = "AuthenticationError")]
    Authentication,
    /// Valid identity, adapter not in its allow-list
    #[serde(rename = "PermissionDeniedError")]
    PermissionDenied,
    /// Identity exhausted its request quota for the current window
    #[serde(rename = "RateLimitExceededError")]
    RateLimitExceeded,
    /// No adapter registered under the requested name
    #[serde(rename = "AdapterNotFoundError")]
    AdapterNotFound,
    /// Adapter exists but does not declare the requested operation
    #[serde(rename = "OperationNotFoundError")]
    OperationNotFound,
    /// Arguments failed schema validation
    #[serde(rename = "InvalidArgumentsError")]
    InvalidArguments,
    /// Adapter did not answer within the configured timeout
    #[serde(rename = "AdapterTimeoutError")]
    AdapterTimeout,
    /// The wrapped external system failed
    #[serde(rename = "AdapterExecutionError")]
    AdapterExecution,
    /// Adapter name already registered
    #[serde(rename = "DuplicateAdapterError")]
    DuplicateAdapter,
    /// Correlation id already in flight on the same connection
    #[serde(rename = "DuplicateRequestError")]
    DuplicateRequest,
    /// Malformed request or message
    #[serde(rename = "InvalidRequestError")]
    InvalidRequest,
    /// Configuration error
    #[serde(rename = "ConfigError")]
    Config,
    /// Internal gateway error (bug, unexpected state)
    #[serde(rename = "InternalError")]
    Internal,
}

impl ErrorKind {
    /// Stable kind name used in response envelopes
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Authentication => "AuthenticationError",
            Self::PermissionDenied => "PermissionDeniedError",
            Self::RateLimitExceeded => "RateLimitExceededError",
            Self::AdapterNotFound => "AdapterNotFoundError",
            Self::OperationNotFound => "OperationNotFoundError",
            Self::InvalidArguments => "InvalidArgumentsError",
            Self::AdapterTimeout => "AdapterTimeoutError",
            Self::AdapterExecution => "AdapterExecutionError",
            Self::DuplicateAdapter => "DuplicateAdapterError",
            Self::DuplicateRequest => "DuplicateRequestError",
            Self::InvalidRequest => "InvalidRequestError",
            Self::Config => "ConfigError",
            Self::Internal => "InternalError",
        }
    }

    /// Numeric JSON-RPC error code
    pub const fn rpc_code(&self) -> i32 {
        match self {
            Self::Authentication => protocol::AUTHENTICATION_ERROR,
            Self::PermissionDenied => protocol::PERMISSION_DENIED,
            Self::RateLimitExceeded => protocol::RATE_LIMITED,
            Self::AdapterNotFound => protocol::ADAPTER_NOT_FOUND,
            Self::OperationNotFound => protocol::METHOD_NOT_FOUND,
            Self::InvalidArguments => protocol::INVALID_PARAMS,
            Self::AdapterTimeout => protocol::ADAPTER_TIMEOUT,
            Self::AdapterExecution => protocol::ADAPTER_ERROR,
            Self::DuplicateAdapter => protocol::DUPLICATE_ADAPTER,
            Self::DuplicateRequest => protocol::DUPLICATE_REQUEST,
            Self::InvalidRequest => protocol::INVALID_REQUEST,
            Self::Config | Self::Internal => protocol::INTERNAL_ERROR,
        }
    }

    /// String code used on the bidirectional stream transport
    pub const fn stream_code(&self) -> &'static str {
        match self {
            Self::Authentication => "auth_failed",
            Self::PermissionDenied => "permission_denied",
            Self::RateLimitExceeded => "rate_limited",
            Self::AdapterNotFound => "adapter_not_found",
            Self::OperationNotFound => "operation_not_found",
            Self::InvalidArguments => "invalid_arguments",
            Self::AdapterTimeout => "adapter_timeout",
            Self::AdapterExecution => "adapter_error",
            Self::DuplicateAdapter => "duplicate_adapter",
            Self::DuplicateRequest => "duplicate_request",
            Self::InvalidRequest => "invalid_message",
            Self::Config | Self::Internal => "internal_error",
        }
    }

    /// Whether a client may retry the same request later without changing it
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::AdapterTimeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single schema violation reported by argument validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer to the offending value (empty for the root object)
    pub path: String,
    /// Description of the violated constraint
    pub message: String,
}

impl GatewayError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    /// Attach structured detail to the error
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    /// Create a permission-denied error for an identity/adapter pair
    pub fn permission_denied(identity: &str, adapter: &str) -> Self {
        Self::new(
            ErrorKind::PermissionDenied,
            format!("Identity '{identity}' is not permitted to use adapter '{adapter}'"),
        )
    }

    /// Create a rate-limit error carrying a retry-after hint
    pub fn rate_limited(retry_after: Duration) -> Self {
        let secs = retry_after_secs(retry_after);
        Self::new(
            ErrorKind::RateLimitExceeded,
            format!("Rate limit exceeded. Retry after {secs} seconds"),
        )
        .with_data(json!({ "retryAfterSecs": secs }))
    }

    /// Create an adapter-not-found error
    pub fn adapter_not_found(adapter: &str) -> Self {
        Self::new(
            ErrorKind::AdapterNotFound,
            format!("Unknown adapter: {adapter}"),
        )
    }

    /// Create an operation-not-found error
    pub fn operation_not_found(adapter: &str, operation: &str) -> Self {
        Self::new(
            ErrorKind::OperationNotFound,
            format!("Adapter '{adapter}' has no operation '{operation}'"),
        )
    }

    /// Create an invalid-arguments error listing every violation
    pub fn invalid_arguments(violations: Vec<Violation>) -> Self {
        let summary = violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        Self::new(
            ErrorKind::InvalidArguments,
            format!("Invalid arguments: {summary}"),
        )
        .with_data(json!({ "violations": violations }))
    }

    /// Create an adapter timeout error
    pub fn adapter_timeout(adapter: &str, operation: &str, timeout: Duration) -> Self {
        Self::new(
            ErrorKind::AdapterTimeout,
            format!(
                "Adapter '{adapter}' did not complete '{operation}' within {}ms",
                timeout.as_millis()
            ),
        )
    }

    /// Create an adapter execution error
    pub fn adapter_execution(adapter: &str, message: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::AdapterExecution,
            format!("{adapter}: {}", message.as_ref()),
        )
    }

    /// Create a duplicate-adapter registration error
    pub fn duplicate_adapter(adapter: &str) -> Self {
        Self::new(
            ErrorKind::DuplicateAdapter,
            format!("Adapter already registered: {adapter}"),
        )
    }

    /// Create a duplicate in-flight request error
    pub fn duplicate_request(correlation_id: &str) -> Self {
        Self::new(
            ErrorKind::DuplicateRequest,
            format!("Request id already in flight: {correlation_id}"),
        )
    }

    /// Create an invalid-request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Retry hint in whole seconds, present on rate-limit errors
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.data
            .as_ref()
            .and_then(|d| d.get("retryAfterSecs"))
            .and_then(Value::as_u64)
    }
}

/// Round a retry hint up to whole seconds, never below one
fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for GatewayError {}

// ============================================================================
// Adapter Contract
// ============================================================================

/// Declaration of one callable operation exposed by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Operation name, unique within its adapter
    pub name: String,
    /// Human-readable description shown during tool discovery
    pub description: String,
    /// JSON Schema the arguments must satisfy
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl OperationSpec {
    /// Create an operation declaration
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Failure categories an adapter can report from `invoke`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterErrorKind {
    /// Arguments were well-formed per schema but semantically unacceptable
    Validation,
    /// The adapter does not implement the requested operation
    UnknownOperation,
    /// The resource the operation targets does not exist
    NotFound,
    /// The external system failed
    Execution,
}

/// Typed failure returned by [`Adapter::invoke`]
#[derive(Debug, Clone)]
pub struct AdapterError {
    /// Failure category
    pub kind: AdapterErrorKind,
    /// Detail message (may contain internal information; sanitized by the dispatcher)
    pub message: String,
}

impl AdapterError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Validation,
            message: message.into(),
        }
    }

    /// Create an unknown-operation error
    pub fn unknown_operation(operation: &str) -> Self {
        Self {
            kind: AdapterErrorKind::UnknownOperation,
            message: format!("Unknown operation: {operation}"),
        }
    }

    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::NotFound,
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self {
            kind: AdapterErrorKind::Execution,
            message: message.into(),
        }
    }
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for AdapterError {}

/// Capability interface every backend adapter implements
///
/// An adapter is registered once under [`Adapter::name`] and never mutated
/// afterwards. The dispatcher validates arguments against the declared
/// schemas before calling [`Adapter::invoke`], so implementations only need
/// to handle semantic checks.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Unique adapter name (e.g., `filesystem`, `memory`)
    fn name(&self) -> &str;

    /// Operations this adapter exposes
    fn operations(&self) -> Vec<OperationSpec>;

    /// Execute an operation with schema-validated arguments
    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, AdapterError>;
}
