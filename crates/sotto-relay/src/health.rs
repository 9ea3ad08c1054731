// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unauthenticated health and metrics endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use sotto_core::HealthStatus;

use crate::state::RelayState;

fn render_health(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    }
}

/// `GET /healthz`: aggregate adapter health.
pub async fn get_healthz(State(state): State<RelayState>) -> Response {
    let store = state
        .store
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));
    let gateway = state
        .gateway
        .health_check()
        .await
        .unwrap_or_else(|e| HealthStatus::Unhealthy(e.to_string()));

    let all_healthy = store == HealthStatus::Healthy && gateway == HealthStatus::Healthy;
    let status = if all_healthy { "ok" } else { "degraded" };

    let mut adapters = serde_json::Map::new();
    adapters.insert(state.store.name().to_string(), render_health(&store).into());
    adapters.insert(
        state.gateway.name().to_string(),
        render_health(&gateway).into(),
    );

    Json(serde_json::json!({
        "status": status,
        "uptime_secs": state.health.start_time.elapsed().as_secs(),
        "adapters": adapters,
    }))
    .into_response()
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn get_metrics(State(state): State<RelayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (StatusCode::OK, render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics not enabled\n").into_response(),
    }
}
