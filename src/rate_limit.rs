// ABOUTME: Fixed-window request counters keyed per client identity
// ABOUTME: One shared limiter per process; per-entry locking prevents lost updates under bursts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Requests allowed per rolling window for one identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Maximum requests accepted within one window
    pub requests: u32,
    /// Window length
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Create a policy of `requests` per `window`
    pub const fn new(requests: u32, window: Duration) -> Self {
        Self { requests, window }
    }

    /// Convenience constructor for per-minute quotas
    pub const fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }
}

/// Counter state for one identity
#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window rate limiter
///
/// Created once when the guard is built and shared by every transport, so
/// all requests from one identity draw from the same counter. The map entry
/// guard serializes updates per identity while other identities proceed in
/// parallel.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    /// Create a limiter with no recorded traffic
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
        }
    }

    /// Record one request for `key`, or report how long until the window rolls over
    ///
    /// Rejected requests are not counted against the quota.
    pub fn check(&self, key: &str, policy: &RateLimitPolicy) -> Result<(), Duration> {
        let now = Instant::now();
        let mut entry = self.windows.entry(key.to_owned()).or_insert(Window {
            count: 0,
            started: now,
        });

        if now.duration_since(entry.started) >= policy.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= policy.requests {
            let elapsed = now.duration_since(entry.started);
            return Err(policy.window.saturating_sub(elapsed));
        }

        entry.count += 1;
        Ok(())
    }

    /// Requests still available to `key` in its current window
    pub fn remaining(&self, key: &str, policy: &RateLimitPolicy) -> u32 {
        self.windows.get(key).map_or(policy.requests, |w| {
            if Instant::now().duration_since(w.started) >= policy.window {
                policy.requests
            } else {
                policy.requests.saturating_sub(w.count)
            }
        })
    }
}
