// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder (Prometheus, statsd, etc.)
//! can collect these metrics.

use metrics::{describe_counter, describe_gauge, describe_histogram};
use sotto_core::{LimitScope, TypingDirection};

/// How a relay request ended, for the `outcome` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// An upstream stream was opened and relayed to completion.
    Streamed,
    /// The handoff path answered without opening a stream.
    Handoff,
    /// An admission gate turned the request away (429/503/409).
    Rejected,
    /// The upstream or store failed mid-request.
    Error,
}

impl RequestOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestOutcome::Streamed => "streamed",
            RequestOutcome::Handoff => "handoff",
            RequestOutcome::Rejected => "rejected",
            RequestOutcome::Error => "error",
        }
    }
}

/// Register all Sotto metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "sotto_relay_requests_total",
        "Relay requests by terminal outcome"
    );
    describe_gauge!("sotto_active_streams", "Upstream streams currently open");
    describe_counter!(
        "sotto_rate_limited_total",
        "Requests denied by an admission gate"
    );
    describe_counter!("sotto_stream_chunks_total", "Re-encrypted chunks relayed");
    describe_histogram!(
        "sotto_relay_latency_seconds",
        "Relay request latency in seconds, first byte in to last byte out"
    );
    describe_counter!("sotto_typing_events_total", "Typing signals relayed");
}

/// Record a finished relay request.
pub fn record_request(outcome: RequestOutcome) {
    metrics::counter!("sotto_relay_requests_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a window-gate denial.
pub fn record_rate_limited(scope: LimitScope) {
    metrics::counter!("sotto_rate_limited_total", "scope" => scope.to_string()).increment(1);
}

/// Record a denial by the global concurrency gauge.
pub fn record_stream_saturated() {
    metrics::counter!("sotto_rate_limited_total", "scope" => "streams").increment(1);
}

/// Record one re-encrypted chunk sent to the caller.
pub fn record_chunk() {
    metrics::counter!("sotto_stream_chunks_total").increment(1);
}

/// Set the number of open upstream streams.
pub fn set_active_streams(count: f64) {
    metrics::gauge!("sotto_active_streams").set(count);
}

/// Record end-to-end relay latency.
pub fn record_latency(seconds: f64) {
    metrics::histogram!("sotto_relay_latency_seconds").record(seconds);
}

/// Record a relayed typing signal.
pub fn record_typing(direction: TypingDirection) {
    metrics::counter!("sotto_typing_events_total", "direction" => direction.to_string())
        .increment(1);
}
