// ABOUTME: Library root re-exporting server modules for integration testing
// ABOUTME: Enables tests/ to access router, state, transports, and handler modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod auth;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod execute;
pub mod health;
pub mod mcp_http;
pub mod router;
pub mod state;
pub mod ws;
