// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state for axum request handlers.

use std::sync::Arc;

use sotto_bus::EventBus;
use sotto_core::{CompletionGateway, ConversationStore};
use sotto_crypto::Keyring;
use sotto_limiter::RateLimiter;
use sotto_session::HandoffClassifier;

/// Health state for the unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        }
    }
}

/// Shared state for all relay handlers.
#[derive(Clone)]
pub struct RelayState {
    /// External conversation/message datastore.
    pub store: Arc<dyn ConversationStore>,
    /// Upstream completion gateway.
    pub gateway: Arc<dyn CompletionGateway>,
    /// Admission gates, checked before any upstream spend.
    pub limiter: RateLimiter,
    /// Process-local pub/sub for SSE fan-out.
    pub bus: EventBus,
    /// Detector for "I want a human" messages.
    pub classifier: Arc<dyn HandoffClassifier>,
    /// Per-session key derivation.
    pub keyring: Arc<Keyring>,
    /// Health state for unauthenticated endpoints.
    pub health: HealthState,
}
