// ABOUTME: Gateway event bus and the GET /api/v1/events server-push (SSE) stream
// ABOUTME: Sends a connected event, periodic heartbeats, and broadcast notifications until shutdown
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use futures::{stream, Stream, StreamExt};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::state::SharedState;

/// Buffered notifications per subscriber before lagging ones are skipped
const EVENT_BUS_CAPACITY: usize = 256;

/// Gateway-wide notification published to server-push subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// An adapter was registered at runtime
    AdapterRegistered {
        /// Adapter name
        adapter: String,
    },
    /// A streaming connection opened or closed
    ConnectionsChanged {
        /// Live connection count after the change
        connections: usize,
    },
    /// The gateway is shutting down
    Shutdown,
}

/// Broadcast channel carrying [`Notification`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Notification>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}

impl EventBus {
    /// Create a bus buffering `capacity` notifications per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification, returning how many subscribers received it
    pub fn publish(&self, notification: Notification) -> usize {
        // Err only means nobody is listening
        self.sender.send(notification).unwrap_or(0)
    }

    /// Subscribe to future notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }
}

/// One payload on the server-push stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushEvent {
    /// First event on every stream
    Connected {
        /// Emission time
        timestamp: DateTime<Utc>,
        /// Seconds between heartbeats
        #[serde(rename = "heartbeatIntervalSecs")]
        heartbeat_interval_secs: u64,
    },
    /// Periodic liveness signal
    Heartbeat {
        /// Emission time
        timestamp: DateTime<Utc>,
    },
    /// Relayed [`Notification`]
    Notification {
        /// Emission time
        timestamp: DateTime<Utc>,
        /// The notification
        notification: Notification,
    },
}

impl PushEvent {
    /// SSE event name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Heartbeat { .. } => "heartbeat",
            Self::Notification { .. } => "notification",
        }
    }

    fn into_sse(self) -> Event {
        let data = serde_json::to_string(&self).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize push event");
            "{}".to_owned()
        });
        Event::default().event(self.name()).data(data)
    }
}

struct Feed {
    greeted: bool,
    finished: bool,
    heartbeat_secs: u64,
    heartbeat: Interval,
    notifications: broadcast::Receiver<Notification>,
    shutdown: watch::Receiver<bool>,
}

impl Feed {
    async fn next_event(&mut self) -> Option<PushEvent> {
        if self.finished {
            return None;
        }

        if !self.greeted {
            if *self.shutdown.borrow_and_update() {
                return None;
            }
            self.greeted = true;
            return Some(PushEvent::Connected {
                timestamp: Utc::now(),
                heartbeat_interval_secs: self.heartbeat_secs,
            });
        }

        loop {
            tokio::select! {
                biased;

                received = self.notifications.recv() => match received {
                    Ok(notification) => {
                        self.finished = notification == Notification::Shutdown;
                        return Some(PushEvent::Notification {
                            timestamp: Utc::now(),
                            notification,
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Push subscriber lagged, skipping notifications");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                _ = self.heartbeat.tick() => {
                    return Some(PushEvent::Heartbeat { timestamp: Utc::now() });
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow_and_update() {
                        return None;
                    }
                }
            }
        }
    }
}

/// Build the push feed: `connected`, then heartbeats and notifications until shutdown
///
/// A `shutdown` notification published before the shutdown flag flips is
/// delivered as the final event.
pub fn push_feed(
    events: &EventBus,
    shutdown: watch::Receiver<bool>,
    heartbeat_interval: Duration,
) -> impl Stream<Item = PushEvent> + Send + 'static {
    // Interval periods must be non-zero
    let period = heartbeat_interval.max(Duration::from_secs(1));
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let feed = Feed {
        greeted: false,
        finished: false,
        heartbeat_secs: period.as_secs(),
        heartbeat,
        notifications: events.subscribe(),
        shutdown,
    };

    stream::unfold(feed, |mut feed| async move {
        feed.next_event().await.map(|event| (event, feed))
    })
}

/// Handle GET /api/v1/events
///
/// Unauthenticated; ends when the client disconnects or the gateway shuts down.
pub async fn handle(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("Push stream subscriber connected");
    let feed = push_feed(
        &state.events,
        state.shutdown_signal(),
        state.heartbeat_interval(),
    );
    Sse::new(feed.map(|event| Ok(event.into_sse()))).keep_alive(KeepAlive::default())
}
