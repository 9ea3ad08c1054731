// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state.

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use sotto_core::SottoError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AdminAuth, admin_auth_middleware};
use crate::state::RelayState;
use crate::{admin, chat, health, visitor};

/// Assemble the full relay router.
pub fn build_router(state: RelayState, auth: AdminAuth) -> Router {
    // Unauthenticated public routes (health + metrics for probes and
    // Prometheus, plus the widget-facing endpoints).
    let public_routes = Router::new()
        .route("/healthz", get(health::get_healthz))
        .route("/metrics", get(health::get_metrics))
        .route("/encrypted-chat-ai", post(chat::post_encrypted_chat))
        .route("/visitor/session", post(visitor::post_session))
        .route("/visitor/conversation", get(visitor::get_conversation))
        .route(
            "/visitor/messages",
            get(visitor::get_messages).post(visitor::post_messages),
        )
        .route(
            "/visitor/typing",
            get(visitor::get_typing).post(visitor::post_typing),
        )
        .route("/visitor/events", get(visitor::get_events))
        .with_state(state.clone());

    // Admin routes behind the fail-closed bearer middleware.
    let admin_routes = Router::new()
        .route("/admin/conversations", get(admin::list_conversations))
        .route(
            "/admin/conversations/{id}/messages",
            get(admin::get_messages).post(admin::post_message),
        )
        .route("/admin/conversations/{id}/claim", post(admin::post_claim))
        .route("/admin/conversations/{id}/close", post(admin::post_close))
        .route(
            "/admin/conversations/{id}/typing",
            get(admin::get_typing).post(admin::post_typing),
        )
        .route("/admin/conversations/{id}/events", get(admin::get_events))
        .route_layer(axum_middleware::from_fn_with_state(
            auth,
            admin_auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Start the relay server; runs until ctrl-c.
pub async fn serve(bind: &str, state: RelayState, auth: AdminAuth) -> Result<(), SottoError> {
    let app = build_router(state, auth);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| SottoError::Internal(format!("failed to bind relay to {bind}: {e}")))?;

    tracing::info!("relay server listening on {bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SottoError::Internal(format!("relay server error: {e}")))?;

    tracing::info!("relay server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
        // Without a handler the server runs until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
