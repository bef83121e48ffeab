// ABOUTME: CLI entry point for the switchyard gateway server binary
// ABOUTME: Loads config, assembles the gateway, and serves axum until Ctrl-C
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use switchyard::config::{default_config_path, load_config, parse_timeout};
use switchyard::{Gateway, GatewayError};

use switchyard_server::router;
use switchyard_server::state::{GatewayState, SharedState};

/// switchyard-server: MCP gateway over HTTP, WebSocket, and SSE
#[derive(Parser)]
#[command(name = "switchyard-server", version, about)]
struct Cli {
    /// HTTP listen port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// HTTP listen host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Gateway config file (defaults to `<config dir>/switchyard/gateway.toml`)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Adapter call timeout in seconds (overrides the config file)
    #[arg(long, value_parser = parse_timeout)]
    adapter_timeout: Option<Duration>,

    /// Server-push heartbeat interval in seconds (overrides the config file)
    #[arg(long, value_parser = parse_timeout)]
    heartbeat_interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .or_else(default_config_path)
        .ok_or_else(|| GatewayError::config("No config path given and no config directory found"))?;
    let config = load_config(&config_path).await?;
    let gateway = Gateway::from_config(&config, cli.adapter_timeout).await?;
    let heartbeat = cli
        .heartbeat_interval
        .unwrap_or_else(|| config.heartbeat_interval());

    let state: SharedState = Arc::new(GatewayState::new(gateway, heartbeat));
    let app = router::build(Arc::clone(&state));

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!(
        address = %addr,
        config = %config_path.display(),
        adapters = state.registry().len(),
        "Starting switchyard gateway server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| GatewayError::internal(format!("Server error: {e}")))?;

    tracing::info!("Gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C after telling every stream to wind down
async fn shutdown_signal(state: SharedState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        return;
    }
    state.trigger_shutdown();
}
