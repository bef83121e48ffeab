// ABOUTME: CLI entry point for the switchyard MCP stdio server binary
// ABOUTME: Loads gateway config, binds the chosen identity, and serves MCP over stdin/stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use switchyard::config::{default_config_path, load_config, parse_timeout};
use switchyard::{Gateway, GatewayError};

use switchyard_mcp::transport::stdio::StdioTransport;
use switchyard_mcp::transport::McpTransport;
use switchyard_mcp::McpServer;

/// switchyard-mcp: every gateway adapter as an MCP tool over stdio
#[derive(Parser)]
#[command(name = "switchyard-mcp", version, about)]
struct Cli {
    /// Gateway config file (defaults to `<config dir>/switchyard/gateway.toml`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Identity whose allow-list and rate limit apply to this session
    #[arg(long)]
    identity: String,

    /// Adapter call timeout in seconds (overrides the config file)
    #[arg(long, value_parser = parse_timeout)]
    adapter_timeout: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr to keep stdout clean for stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(default_config_path)
        .ok_or_else(|| GatewayError::config("No config path given and no config directory found"))?;
    let config = load_config(&config_path).await?;
    let gateway = Gateway::from_config(&config, cli.adapter_timeout).await?;

    let identity = gateway.guard.identity(&cli.identity).ok_or_else(|| {
        GatewayError::config(format!("Unknown identity: {}", cli.identity))
    })?;

    tracing::info!(
        config = %config_path.display(),
        identity = %identity.id,
        adapters = gateway.registry.len(),
        "Starting switchyard MCP server on stdio"
    );

    let server = Arc::new(McpServer::new(gateway.dispatcher));
    StdioTransport::new(identity).serve(server).await?;

    Ok(())
}
