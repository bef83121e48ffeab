// ABOUTME: Connection tracker for streaming transports with per-connection in-flight request ids
// ABOUTME: Rejects duplicate in-flight correlation ids and drops responses for closed connections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::types::GatewayError;

#[derive(Debug)]
struct ConnectionRecord {
    identity: Option<String>,
    connected_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    in_flight: HashSet<String>,
    metadata: HashMap<String, String>,
}

/// Snapshot of one live connection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Connection id assigned at connect time
    pub connection_id: String,
    /// Bound identity id, `None` until authenticated
    pub identity: Option<String>,
    /// When the connection was opened
    pub connected_at: DateTime<Utc>,
    /// Last inbound activity
    pub last_seen: DateTime<Utc>,
    /// Number of requests awaiting a response
    pub in_flight: usize,
    /// Transport-supplied details (transport name, peer agent)
    pub metadata: HashMap<String, String>,
}

/// Tracks live streaming connections
#[derive(Debug, Default)]
pub struct SessionTracker {
    connections: DashMap<String, ConnectionRecord>,
}

impl SessionTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Start tracking a connection
    pub fn register(&self, connection_id: &str, metadata: HashMap<String, String>) {
        let now = Utc::now();
        self.connections.insert(
            connection_id.to_owned(),
            ConnectionRecord {
                identity: None,
                connected_at: now,
                last_seen: now,
                in_flight: HashSet::new(),
                metadata,
            },
        );
        debug!(connection_id, "Connection registered");
    }

    /// Record the identity that authenticated on a connection
    pub fn bind_identity(&self, connection_id: &str, identity: &str) -> bool {
        self.connections
            .get_mut(connection_id)
            .map(|mut record| {
                record.identity = Some(identity.to_owned());
                record.last_seen = Utc::now();
            })
            .is_some()
    }

    /// Record inbound activity
    pub fn touch(&self, connection_id: &str) {
        if let Some(mut record) = self.connections.get_mut(connection_id) {
            record.last_seen = Utc::now();
        }
    }

    /// Mark a correlation id as in flight on a connection
    pub fn begin_request(&self, connection_id: &str, correlation_id: &str) -> Result<(), GatewayError> {
        let mut record = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| GatewayError::internal(format!("Unknown connection: {connection_id}")))?;

        if record.in_flight.insert(correlation_id.to_owned()) {
            record.last_seen = Utc::now();
            Ok(())
        } else {
            Err(GatewayError::duplicate_request(correlation_id))
        }
    }

    /// Clear an in-flight correlation id
    ///
    /// Returns `false` when the connection is gone or the id was not in
    /// flight, in which case the response must not be delivered.
    pub fn complete_request(&self, connection_id: &str, correlation_id: &str) -> bool {
        self.connections
            .get_mut(connection_id)
            .is_some_and(|mut record| record.in_flight.remove(correlation_id))
    }

    /// Stop tracking a connection, abandoning its in-flight requests
    pub fn unregister(&self, connection_id: &str) {
        if let Some((_, record)) = self.connections.remove(connection_id) {
            debug!(
                connection_id,
                abandoned = record.in_flight.len(),
                "Connection unregistered"
            );
        }
    }

    /// Snapshot of every live connection, oldest first
    pub fn list(&self) -> Vec<ConnectionInfo> {
        let mut connections: Vec<ConnectionInfo> = self
            .connections
            .iter()
            .map(|entry| {
                let record = entry.value();
                ConnectionInfo {
                    connection_id: entry.key().clone(),
                    identity: record.identity.clone(),
                    connected_at: record.connected_at,
                    last_seen: record.last_seen,
                    in_flight: record.in_flight.len(),
                    metadata: record.metadata.clone(),
                }
            })
            .collect();
        connections.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.connection_id.cmp(&b.connection_id))
        });
        connections
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are live
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
