// ABOUTME: Per-connection WebSocket state machine from auth_required through authenticated to closed
// ABOUTME: Dispatches tool calls on their own tasks and delivers responses in completion order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::collections::HashMap;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde_json::Value;
use switchyard::{ClientIdentity, Dispatcher, RequestEnvelope, SessionTracker};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use super::messages::{codes, ClientCommand, ClientMessage, ServerMessage};
use crate::events::{EventBus, Notification};

/// A frame received from the client, already stripped of transport detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// UTF-8 text frame
    Text(String),
    /// The peer closed or the socket failed
    Close,
}

/// Everything a session needs besides its channels
#[derive(Clone)]
pub struct SessionContext {
    /// Request dispatcher (also carries the guard)
    pub dispatcher: Arc<Dispatcher>,
    /// Connection tracker
    pub sessions: Arc<SessionTracker>,
    /// Notification bus for connection-count changes
    pub events: EventBus,
    /// Server-assigned connection id
    pub connection_id: String,
    /// Descriptive metadata recorded with the connection
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Close,
}

struct Session {
    ctx: SessionContext,
    outbound: mpsc::Sender<ServerMessage>,
    identity: Option<Arc<ClientIdentity>>,
}

/// Drive one connection until the client closes or shutdown is signalled
///
/// Registers the connection, sends the `auth_required` status, and processes
/// inbound frames one at a time. Tool calls run on spawned tasks; their
/// responses are dropped if the connection is gone when they finish.
pub async fn run_session<S>(
    inbound: S,
    outbound: mpsc::Sender<ServerMessage>,
    ctx: SessionContext,
    mut shutdown: watch::Receiver<bool>,
) where
    S: Stream<Item = InboundFrame>,
{
    let connection_id = ctx.connection_id.clone();
    ctx.sessions.register(&connection_id, ctx.metadata.clone());
    ctx.events.publish(Notification::ConnectionsChanged {
        connections: ctx.sessions.len(),
    });
    info!(connection_id = %connection_id, "Stream connection opened");

    let mut session = Session {
        ctx,
        outbound,
        identity: None,
    };

    let mut inbound = std::pin::pin!(inbound);
    let mut flow = session
        .send(ServerMessage::auth_required(&connection_id))
        .await;

    while flow == Flow::Continue && !*shutdown.borrow_and_update() {
        let frame = tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            frame = inbound.next() => frame,
        };

        flow = match frame {
            Some(InboundFrame::Text(text)) => {
                session.ctx.sessions.touch(&connection_id);
                session.handle_text(&text).await
            }
            Some(InboundFrame::Close) | None => Flow::Close,
        };
    }

    let sessions = &session.ctx.sessions;
    sessions.unregister(&connection_id);
    session.ctx.events.publish(Notification::ConnectionsChanged {
        connections: sessions.len(),
    });
    info!(connection_id = %connection_id, "Stream connection closed");
}

impl Session {
    async fn send(&self, message: ServerMessage) -> Flow {
        if self.outbound.send(message).await.is_ok() {
            Flow::Continue
        } else {
            debug!(connection_id = %self.ctx.connection_id, "Outbound channel closed");
            Flow::Close
        }
    }

    async fn handle_text(&mut self, text: &str) -> Flow {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                debug!(error = %e, "Failed to parse client message");
                return self
                    .send(ServerMessage::error(
                        None,
                        codes::INVALID_MESSAGE,
                        format!("Invalid message format: {e}"),
                        None,
                    ))
                    .await;
            }
        };

        let id = message.correlation_id();
        let command = match message.command() {
            Ok(command) => command,
            Err(err) => return self.send(ServerMessage::from_gateway_error(id, &err)).await,
        };

        match (command, self.identity.clone()) {
            (ClientCommand::Ping, _) => self.send(ServerMessage::pong(id)).await,
            (ClientCommand::Close, _) => Flow::Close,
            (ClientCommand::Auth { token }, _) => self.authenticate(id, &token).await,
            (_, None) => {
                self.send(ServerMessage::error(
                    id,
                    codes::AUTH_REQUIRED,
                    "Authenticate with an auth message first",
                    None,
                ))
                .await
            }
            (ClientCommand::ListTools, Some(identity)) => {
                let servers = self.ctx.dispatcher.visible_adapters(&identity);
                self.send(ServerMessage::tool_list(id, &servers)).await
            }
            (
                ClientCommand::ToolCall {
                    server_id,
                    tool_name,
                    params,
                },
                Some(identity),
            ) => {
                self.start_tool_call(id, identity, server_id, tool_name, params)
                    .await
            }
        }
    }

    async fn authenticate(&mut self, id: Option<String>, token: &str) -> Flow {
        match self.ctx.dispatcher.guard().authenticate(token) {
            Ok(identity) => {
                self.ctx
                    .sessions
                    .bind_identity(&self.ctx.connection_id, &identity.id);
                debug!(
                    connection_id = %self.ctx.connection_id,
                    identity = %identity.id,
                    "Stream connection authenticated"
                );
                let status =
                    ServerMessage::authenticated(id, &self.ctx.connection_id, &identity.id);
                self.identity = Some(identity);
                self.send(status).await
            }
            Err(err) => self.send(ServerMessage::from_gateway_error(id, &err)).await,
        }
    }

    async fn start_tool_call(
        &self,
        id: Option<String>,
        identity: Arc<ClientIdentity>,
        server_id: String,
        tool_name: String,
        params: Value,
    ) -> Flow {
        let Some(correlation_id) = id else {
            return self
                .send(ServerMessage::error(
                    None,
                    codes::INVALID_MESSAGE,
                    "tool_call requires an id",
                    None,
                ))
                .await;
        };

        if let Err(err) = self.ctx.dispatcher.guard().check_rate(&identity) {
            return self
                .send(ServerMessage::from_gateway_error(Some(correlation_id), &err))
                .await;
        }

        if let Err(err) = self
            .ctx
            .sessions
            .begin_request(&self.ctx.connection_id, &correlation_id)
        {
            return self
                .send(ServerMessage::from_gateway_error(Some(correlation_id), &err))
                .await;
        }

        let envelope = RequestEnvelope::new(
            identity,
            server_id.clone(),
            tool_name.clone(),
            params,
            Some(correlation_id.clone()),
        );
        let dispatcher = Arc::clone(&self.ctx.dispatcher);
        let sessions = Arc::clone(&self.ctx.sessions);
        let connection_id = self.ctx.connection_id.clone();
        let outbound = self.outbound.clone();

        tokio::spawn(async move {
            let response = dispatcher.dispatch(envelope).await;

            if !sessions.complete_request(&connection_id, &correlation_id) {
                debug!(
                    connection_id = %connection_id,
                    correlation_id = %correlation_id,
                    "Dropping response for closed connection"
                );
                return;
            }

            let message = match response.outcome {
                Ok(result) => {
                    ServerMessage::tool_response(correlation_id, &server_id, &tool_name, result)
                }
                Err(err) => ServerMessage::from_gateway_error(Some(correlation_id), &err),
            };
            if outbound.send(message).await.is_err() {
                debug!(connection_id = %connection_id, "Outbound channel closed before delivery");
            }
        });

        Flow::Continue
    }
}
