// ABOUTME: Library root for the switchyard MCP server
// ABOUTME: Exposes the protocol types, McpServer, and transports for the binary and the HTTP gateway
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod protocol;
pub mod server;
pub mod transport;

pub use server::McpServer;
