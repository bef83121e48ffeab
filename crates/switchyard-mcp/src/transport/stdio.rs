// ABOUTME: Stdio transport reading newline-delimited JSON-RPC from stdin and writing to stdout
// ABOUTME: Serves local MCP clients on behalf of one identity chosen at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;

use async_trait::async_trait;
use switchyard::{ClientIdentity, GatewayError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error};

use crate::protocol::{JsonRpcRequest, JsonRpcResponse, PARSE_ERROR};
use crate::server::McpServer;
use crate::transport::McpTransport;

/// MCP transport over stdin/stdout using newline-delimited JSON-RPC
///
/// Each line on stdin is expected to be a complete JSON-RPC message.
/// Responses are written as single lines to stdout. Logs go to stderr
/// to avoid polluting the protocol channel.
pub struct StdioTransport {
    identity: Arc<ClientIdentity>,
}

impl StdioTransport {
    /// Create a transport that acts as `identity` for every request
    pub const fn new(identity: Arc<ClientIdentity>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn serve(self, server: Arc<McpServer>) -> Result<(), GatewayError> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        serve_lines(stdin, &mut stdout, &server, &self.identity).await
    }
}

/// Serve JSON-RPC lines from `reader` until EOF, writing responses to `writer`
pub async fn serve_lines<R, W>(
    reader: R,
    writer: &mut W,
    server: &McpServer,
    identity: &Arc<ClientIdentity>,
) -> Result<(), GatewayError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    debug!(identity = %identity.id, "Stdio transport ready, waiting for JSON-RPC messages on stdin");

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                error!(error = %e, "Failed to parse JSON-RPC request");
                let resp = JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                write_response(writer, &resp).await?;
                continue;
            }
        };

        debug!(method = %request.method, "Handling MCP request");

        if let Some(response) = server.handle_request(request, identity).await {
            write_response(writer, &response).await?;
        }
    }

    debug!("Stdin closed, shutting down stdio transport");
    Ok(())
}

/// Serialize and write a JSON-RPC response as a single line
async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> Result<(), GatewayError>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)
        .map_err(|e| GatewayError::internal(format!("JSON serialization failed: {e}")))?;

    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| GatewayError::internal(format!("stdout write failed: {e}")))?;

    writer
        .write_all(b"\n")
        .await
        .map_err(|e| GatewayError::internal(format!("stdout newline write failed: {e}")))?;

    writer
        .flush()
        .await
        .map_err(|e| GatewayError::internal(format!("stdout flush failed: {e}")))?;

    Ok(())
}
