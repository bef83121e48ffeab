// ABOUTME: Request and response envelopes flowing through the dispatcher
// ABOUTME: One RequestEnvelope in, exactly one ResponseEnvelope out, correlated by id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::ClientIdentity;
use crate::types::GatewayError;

/// A unit of work for the dispatcher
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    /// Caller-supplied (streams) or generated (synchronous calls) correlation id
    pub correlation_id: String,
    /// Target adapter name
    pub adapter: String,
    /// Target operation name
    pub operation: String,
    /// Untyped arguments, validated against the operation schema
    pub arguments: Value,
    /// Authenticated caller
    pub identity: Arc<ClientIdentity>,
    /// Arrival time
    pub received_at: DateTime<Utc>,
}

impl RequestEnvelope {
    /// Create an envelope, generating a correlation id when none is supplied
    pub fn new(
        identity: Arc<ClientIdentity>,
        adapter: impl Into<String>,
        operation: impl Into<String>,
        arguments: Value,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.unwrap_or_else(generate_correlation_id),
            adapter: adapter.into(),
            operation: operation.into(),
            arguments,
            identity,
            received_at: Utc::now(),
        }
    }
}

/// Generate a fresh correlation id for calls that arrive without one
pub fn generate_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4().simple())
}

/// The single outcome of a dispatched request
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// Correlation id of the originating request
    pub correlation_id: String,
    /// Adapter result or normalized error
    pub outcome: Result<Value, GatewayError>,
    /// Completion time
    pub completed_at: DateTime<Utc>,
}

impl ResponseEnvelope {
    /// Successful response
    pub fn success(correlation_id: impl Into<String>, result: Value) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            outcome: Ok(result),
            completed_at: Utc::now(),
        }
    }

    /// Failed response
    pub fn failure(correlation_id: impl Into<String>, error: GatewayError) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            outcome: Err(error),
            completed_at: Utc::now(),
        }
    }

    /// Whether the request succeeded
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The error, if the request failed
    pub fn error(&self) -> Option<&GatewayError> {
        self.outcome.as_ref().err()
    }

    /// The result, if the request succeeded
    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }
}

impl Serialize for ResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResponseEnvelope", 4)?;
        state.serialize_field("correlationId", &self.correlation_id)?;
        state.serialize_field("success", &self.is_success())?;
        match &self.outcome {
            Ok(result) => state.serialize_field("result", result)?,
            Err(err) => state.serialize_field(
                "error",
                &serde_json::json!({
                    "kind": err.kind,
                    "message": err.message,
                    "detail": err.data,
                }),
            )?,
        }
        state.serialize_field("completedAt", &self.completed_at)?;
        state.end()
    }
}
