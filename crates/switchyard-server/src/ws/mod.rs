// ABOUTME: GET /ws upgrade handler bridging an axum WebSocket to the session state machine
// ABOUTME: Splits the socket into a writer task fed by an mpsc channel and a reader stream
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

pub mod messages;
pub mod session;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::state::SharedState;
use messages::ServerMessage;
use session::{run_session, InboundFrame, SessionContext};

/// Outbound frames buffered per connection before the session waits on the writer
const OUTBOUND_BUFFER: usize = 64;

/// Handle GET /ws
///
/// Authentication happens inside the stream with an `auth` message, so the
/// upgrade itself is open.
pub async fn handle(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<SharedState>,
) -> Response {
    let mut metadata = HashMap::new();
    if let Some(agent) = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
        metadata.insert("userAgent".to_owned(), agent.to_owned());
    }

    ws.on_upgrade(move |socket| handle_socket(socket, state, metadata))
}

async fn handle_socket(socket: WebSocket, state: SharedState, metadata: HashMap<String, String>) {
    let connection_id = format!("conn-{}", Uuid::new_v4().simple());
    debug!(connection_id = %connection_id, "WebSocket upgraded");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let writer = tokio::spawn(forward_outgoing(ws_sink, outbound_rx));

    let inbound = ws_stream.filter_map(|result| async move {
        match result {
            Ok(Message::Text(text)) => Some(InboundFrame::Text(text.as_str().to_owned())),
            Ok(Message::Close(_)) | Err(_) => Some(InboundFrame::Close),
            // Binary frames are ignored; protocol-level pings are answered by axum
            Ok(_) => None,
        }
    });

    let ctx = SessionContext {
        dispatcher: Arc::clone(state.dispatcher()),
        sessions: Arc::clone(&state.sessions),
        events: state.events.clone(),
        connection_id,
        metadata,
    };
    run_session(inbound, outbound_tx, ctx, state.shutdown_signal()).await;

    // Spawned tool calls hold sender clones; once the tracker forgets the
    // connection they drop their responses and the writer drains
    if let Err(e) = writer.await {
        error!(error = %e, "WebSocket writer task failed");
    }
}

/// Forward serialized frames to the socket, closing it when the channel drains
async fn forward_outgoing(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<ServerMessage>,
) {
    while let Some(message) = outbound_rx.recv().await {
        match serde_json::to_string(&message) {
            Ok(json) => {
                if ws_sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => error!(error = %e, "Failed to serialize WebSocket message"),
        }
    }

    if let Err(e) = ws_sink.send(Message::Close(None)).await {
        debug!(error = %e, "WebSocket already closed");
    }
}
