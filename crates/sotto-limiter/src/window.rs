// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-window per-key request counters.
//!
//! One [`WindowGate`] per scope (caller IP, conversation id). The first hit
//! on a key arms `reset_at = now + window`; further hits count against the
//! same window until it expires, at which point the counter re-arms. Denied
//! requests do not consume from the counter.
//!
//! Counters are process-local and advisory: a restart resets them, and
//! multiple relay instances each keep their own. See the workspace design
//! notes for the externalization path.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Admission verdict from one gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests left in the current window (0 when denied).
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// A keyed fixed-window counter.
pub struct WindowGate {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl WindowGate {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Check and (when allowed) consume one request for `key`.
    pub fn check(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + self.window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_requests {
            return Decision {
                allowed: false,
                remaining: 0,
            };
        }

        entry.count += 1;
        Decision {
            allowed: true,
            remaining: self.max_requests - entry.count,
        }
    }

    /// Seconds until the window for `key` resets. Full window length for
    /// unknown keys.
    pub fn retry_after(&self, key: &str) -> Duration {
        self.windows
            .get(key)
            .map(|w| w.reset_at.saturating_duration_since(Instant::now()))
            .unwrap_or(self.window)
    }

    /// Drop expired window entries. Called by the sweeper.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at > now);
        before - self.windows.len()
    }

    /// Number of tracked keys (live and expired-but-unswept).
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

impl std::fmt::Debug for WindowGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowGate")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("tracked_keys", &self.windows.len())
            .finish()
    }
}
