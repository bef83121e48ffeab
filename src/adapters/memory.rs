// ABOUTME: In-memory notes adapter scoped by project with store, search, list, and delete operations
// ABOUTME: Notes live for the process lifetime; search matches content and tags case-insensitively
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::types::{Adapter, AdapterError, OperationSpec};

/// Registered name of the memory adapter
pub const ADAPTER_NAME: &str = "memory";

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: u64 = 100;

/// A stored note
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryNote {
    /// Note id
    pub id: String,
    /// Note text
    pub content: String,
    /// Free-form labels
    pub tags: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl MemoryNote {
    fn matches(&self, needle: &str) -> bool {
        self.content.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

#[derive(Deserialize)]
struct StoreArgs {
    project: String,
    content: String,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Deserialize)]
struct SearchArgs {
    project: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Deserialize)]
struct ProjectArgs {
    project: String,
}

#[derive(Deserialize)]
struct DeleteArgs {
    project: String,
    id: String,
}

fn parse<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, AdapterError> {
    serde_json::from_value(arguments).map_err(|e| AdapterError::validation(e.to_string()))
}

/// Project-scoped notes held in process memory
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    projects: DashMap<String, Vec<MemoryNote>>,
}

impl MemoryAdapter {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
        }
    }

    fn store(&self, args: StoreArgs) -> Result<Value, AdapterError> {
        if args.content.trim().is_empty() {
            return Err(AdapterError::validation("content must not be empty"));
        }
        let note = MemoryNote {
            id: Uuid::new_v4().to_string(),
            content: args.content,
            tags: args.tags,
            created_at: Utc::now(),
        };
        let response = json!({
            "id": note.id,
            "project": args.project,
            "createdAt": note.created_at,
        });
        self.projects.entry(args.project).or_default().push(note);
        Ok(response)
    }

    fn search(&self, args: &SearchArgs) -> Value {
        let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let needle = args.query.as_deref().map(str::to_lowercase);

        let mut results: Vec<MemoryNote> = self
            .projects
            .get(&args.project)
            .map(|notes| {
                notes
                    .iter()
                    .filter(|n| needle.as_deref().map_or(true, |q| n.matches(q)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // newest first
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = results.len();
        results.truncate(limit);

        json!({
            "project": args.project,
            "results": results,
            "total": total,
        })
    }

    fn list(&self, args: &ProjectArgs) -> Value {
        let notes = self
            .projects
            .get(&args.project)
            .map(|n| n.clone())
            .unwrap_or_default();
        json!({
            "project": args.project,
            "count": notes.len(),
            "notes": notes,
        })
    }

    fn delete(&self, args: &DeleteArgs) -> Result<Value, AdapterError> {
        let removed = self.projects.get_mut(&args.project).is_some_and(|mut notes| {
            let before = notes.len();
            notes.retain(|n| n.id != args.id);
            notes.len() != before
        });

        if removed {
            Ok(json!({ "deleted": true, "id": args.id }))
        } else {
            Err(AdapterError::not_found(format!(
                "No note '{}' in project '{}'",
                args.id, args.project
            )))
        }
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new(
                "memory_store",
                "Store a note in a project",
                json!({
                    "type": "object",
                    "properties": {
                        "project": { "type": "string", "minLength": 1 },
                        "content": { "type": "string" },
                        "tags": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["project", "content"]
                }),
            ),
            OperationSpec::new(
                "memory_search",
                "Search a project's notes by text or tag, newest first",
                json!({
                    "type": "object",
                    "properties": {
                        "project": { "type": "string", "minLength": 1 },
                        "query": { "type": "string" },
                        "limit": { "type": "integer", "minimum": 1, "maximum": MAX_SEARCH_LIMIT }
                    },
                    "required": ["project"]
                }),
            ),
            OperationSpec::new(
                "memory_list",
                "List every note in a project",
                json!({
                    "type": "object",
                    "properties": {
                        "project": { "type": "string", "minLength": 1 }
                    },
                    "required": ["project"]
                }),
            ),
            OperationSpec::new(
                "memory_delete",
                "Delete a note by id",
                json!({
                    "type": "object",
                    "properties": {
                        "project": { "type": "string", "minLength": 1 },
                        "id": { "type": "string" }
                    },
                    "required": ["project", "id"]
                }),
            ),
        ]
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, AdapterError> {
        match operation {
            "memory_store" => self.store(parse(arguments)?),
            "memory_search" => Ok(self.search(&parse(arguments)?)),
            "memory_list" => Ok(self.list(&parse(arguments)?)),
            "memory_delete" => self.delete(&parse(arguments)?),
            other => Err(AdapterError::unknown_operation(other)),
        }
    }
}
