// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admission control for the Sotto relay.
//!
//! Three independent gates, checked in order before any upstream spend:
//!
//! 1. per-IP window ([`WindowGate`])
//! 2. per-conversation window ([`WindowGate`])
//! 3. global concurrent-stream cap ([`StreamGauge`])
//!
//! All gates are process-local and best-effort; they protect the upstream
//! gateway's budget, they are not a security boundary.

pub mod gauge;
pub mod window;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

pub use gauge::{SATURATED_RETRY_AFTER, StreamGauge, StreamSlot};
pub use window::{Decision, WindowGate};

/// Bundles the two window gates and the stream gauge behind one handle.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    ip_gate: Arc<WindowGate>,
    conversation_gate: Arc<WindowGate>,
    gauge: StreamGauge,
    window: Duration,
}

impl RateLimiter {
    pub fn new(
        per_ip: u32,
        per_conversation: u32,
        max_concurrent_streams: u32,
        window: Duration,
    ) -> Self {
        Self {
            ip_gate: Arc::new(WindowGate::new(per_ip, window)),
            conversation_gate: Arc::new(WindowGate::new(per_conversation, window)),
            gauge: StreamGauge::new(max_concurrent_streams),
            window,
        }
    }

    pub fn check_ip(&self, ip: &str) -> Decision {
        self.ip_gate.check(ip)
    }

    pub fn check_conversation(&self, conversation_id: &str) -> Decision {
        self.conversation_gate.check(conversation_id)
    }

    pub fn ip_retry_after(&self, ip: &str) -> Duration {
        self.ip_gate.retry_after(ip)
    }

    pub fn conversation_retry_after(&self, conversation_id: &str) -> Duration {
        self.conversation_gate.retry_after(conversation_id)
    }

    pub fn gauge(&self) -> &StreamGauge {
        &self.gauge
    }

    /// The configured window length; the `Retry-After` ceiling for denials.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// One sweep pass over both window maps.
    pub fn sweep(&self) -> usize {
        let removed = self.ip_gate.sweep() + self.conversation_gate.sweep();
        if removed > 0 {
            debug!(removed, "swept expired rate-limit windows");
        }
        removed
    }

    /// Spawn the periodic sweeper. Runs until the returned handle is aborted
    /// or the runtime shuts down.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would sweep an empty map; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_are_independent() {
        let limiter = RateLimiter::new(1, 1, 1, Duration::from_secs(3600));

        assert!(limiter.check_ip("1.2.3.4").allowed);
        assert!(!limiter.check_ip("1.2.3.4").allowed);

        // The conversation gate is untouched by IP denials.
        assert!(limiter.check_conversation("c1").allowed);
        assert!(!limiter.check_conversation("c1").allowed);

        // And the gauge still has its slot.
        assert!(limiter.gauge().try_acquire().is_some());
    }

    #[test]
    fn sweep_purges_expired_windows_from_both_maps() {
        let limiter = RateLimiter::new(5, 5, 5, Duration::from_millis(20));
        limiter.check_ip("1.2.3.4");
        limiter.check_conversation("c1");
        assert_eq!(limiter.sweep(), 0, "live windows survive");

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(limiter.sweep(), 2);
    }

    #[test]
    fn sweep_reports_zero_on_empty_maps() {
        let limiter = RateLimiter::new(5, 5, 5, Duration::from_secs(1));
        assert_eq!(limiter.sweep(), 0);
    }
}
