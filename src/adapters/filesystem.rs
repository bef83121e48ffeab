// ABOUTME: Read-only filesystem adapter rooted at a configured directory
// ABOUTME: Resolves every path under the root and rejects traversal outside it, including via symlinks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::types::{Adapter, AdapterError, GatewayError, OperationSpec};

/// Registered name of the filesystem adapter
pub const ADAPTER_NAME: &str = "filesystem";

/// Default cap on bytes returned by `read_file` (1 MiB)
const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;

#[derive(Deserialize)]
struct PathArgs {
    path: String,
}

#[derive(Deserialize)]
struct ReadArgs {
    path: String,
    #[serde(default)]
    max_bytes: Option<u64>,
}

fn parse<T: for<'de> Deserialize<'de>>(arguments: Value) -> Result<T, AdapterError> {
    serde_json::from_value(arguments).map_err(|e| AdapterError::validation(e.to_string()))
}

fn io_error(path: &str, err: &io::Error) -> AdapterError {
    match err.kind() {
        io::ErrorKind::NotFound => AdapterError::not_found(format!("No such file or directory: {path}")),
        io::ErrorKind::PermissionDenied => AdapterError::execution(format!("Permission denied: {path}")),
        _ => AdapterError::execution(format!("I/O error on {path}: {err}")),
    }
}

fn entry_kind(file_type: std::fs::FileType) -> &'static str {
    if file_type.is_dir() {
        "directory"
    } else if file_type.is_symlink() {
        "symlink"
    } else {
        "file"
    }
}

/// Read-only access to files below one directory
#[derive(Debug, Clone)]
pub struct FilesystemAdapter {
    root: PathBuf,
}

impl FilesystemAdapter {
    /// Create an adapter rooted at `root`, which must be an existing directory
    pub async fn new(root: &Path) -> Result<Self, GatewayError> {
        let root = tokio::fs::canonicalize(root).await.map_err(|e| {
            GatewayError::config(format!(
                "Filesystem adapter root {} is not accessible: {e}",
                root.display()
            ))
        })?;
        let metadata = tokio::fs::metadata(&root)
            .await
            .map_err(|e| GatewayError::config(format!("Cannot stat {}: {e}", root.display())))?;
        if !metadata.is_dir() {
            return Err(GatewayError::config(format!(
                "Filesystem adapter root {} is not a directory",
                root.display()
            )));
        }
        debug!(root = %root.display(), "Filesystem adapter rooted");
        Ok(Self { root })
    }

    /// Map a client path onto a canonical path inside the root
    async fn resolve(&self, requested: &str) -> Result<PathBuf, AdapterError> {
        let relative = Path::new(requested);
        let mut depth: usize = 0;
        for component in relative.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                Component::ParentDir => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| AdapterError::validation("path escapes the adapter root"))?;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(AdapterError::validation(
                        "path must be relative to the adapter root",
                    ));
                }
            }
        }

        let canonical = tokio::fs::canonicalize(self.root.join(relative))
            .await
            .map_err(|e| io_error(requested, &e))?;
        if canonical.starts_with(&self.root) {
            Ok(canonical)
        } else {
            Err(AdapterError::validation("path escapes the adapter root"))
        }
    }

    async fn read_file(&self, args: ReadArgs) -> Result<Value, AdapterError> {
        let path = self.resolve(&args.path).await?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&args.path, &e))?;
        if !metadata.is_file() {
            return Err(AdapterError::validation(format!("not a file: {}", args.path)));
        }

        let max_bytes = args.max_bytes.unwrap_or(DEFAULT_MAX_BYTES);
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| io_error(&args.path, &e))?;
        let mut buf = Vec::new();
        file.take(max_bytes)
            .read_to_end(&mut buf)
            .await
            .map_err(|e| io_error(&args.path, &e))?;

        Ok(json!({
            "path": args.path,
            "content": String::from_utf8_lossy(&buf),
            "size": metadata.len(),
            "truncated": metadata.len() > max_bytes,
        }))
    }

    async fn list_directory(&self, args: PathArgs) -> Result<Value, AdapterError> {
        let path = self.resolve(&args.path).await?;
        let mut reader = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| io_error(&args.path, &e))?;

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_error(&args.path, &e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| io_error(&args.path, &e))?;
            let size = if file_type.is_file() {
                entry.metadata().await.map(|m| m.len()).unwrap_or(0)
            } else {
                0
            };
            entries.push(json!({
                "name": entry.file_name().to_string_lossy(),
                "type": entry_kind(file_type),
                "size": size,
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "path": args.path,
            "count": entries.len(),
            "entries": entries,
        }))
    }

    async fn get_file_info(&self, args: PathArgs) -> Result<Value, AdapterError> {
        let path = self.resolve(&args.path).await?;
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| io_error(&args.path, &e))?;
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        Ok(json!({
            "path": args.path,
            "type": entry_kind(metadata.file_type()),
            "size": metadata.len(),
            "modified": modified,
            "readonly": metadata.permissions().readonly(),
        }))
    }
}

#[async_trait]
impl Adapter for FilesystemAdapter {
    fn name(&self) -> &str {
        ADAPTER_NAME
    }

    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new(
                "read_file",
                "Read a text file relative to the adapter root",
                json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "minLength": 1 },
                        "max_bytes": { "type": "integer", "minimum": 1 }
                    },
                    "required": ["path"]
                }),
            ),
            OperationSpec::new(
                "list_directory",
                "List a directory relative to the adapter root",
                json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "minLength": 1 }
                    },
                    "required": ["path"]
                }),
            ),
            OperationSpec::new(
                "get_file_info",
                "Report type, size, and modification time of a path",
                json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "minLength": 1 }
                    },
                    "required": ["path"]
                }),
            ),
        ]
    }

    async fn invoke(&self, operation: &str, arguments: Value) -> Result<Value, AdapterError> {
        match operation {
            "read_file" => self.read_file(parse(arguments)?).await,
            "list_directory" => self.list_directory(parse(arguments)?).await,
            "get_file_info" => self.get_file_info(parse(arguments)?).await,
            other => Err(AdapterError::unknown_operation(other)),
        }
    }
}
