// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Admin routes, all behind the bearer middleware in [`crate::auth`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use sotto_bus::{BusEvent, Topic};
use sotto_core::{ConversationStatus, SenderType, StoredMessage, TypingDirection, TypingEvent};
use sotto_session::identity::id_prefix;
use tracing::info;

use crate::error::error_response;
use crate::sse::bus_events;
use crate::state::RelayState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReply {
    pub message: String,
    #[serde(default)]
    pub admin_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub admin_id: String,
}

/// `GET /admin/conversations`: open conversations, newest-updated first.
pub async fn list_conversations(State(state): State<RelayState>) -> Response {
    match state.store.list_open_conversations().await {
        Ok(conversations) => Json(conversations).into_response(),
        Err(e) => error_response(&e, None),
    }
}

/// `GET /admin/conversations/{id}/messages`
pub async fn get_messages(
    State(state): State<RelayState>,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.store.get_conversation_messages(&conversation_id).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => error_response(&e, None),
    }
}

/// `POST /admin/conversations/{id}/messages`: append an agent reply.
pub async fn post_message(
    State(state): State<RelayState>,
    Path(conversation_id): Path<String>,
    Json(reply): Json<AdminReply>,
) -> Response {
    match state
        .store
        .append_message(
            &conversation_id,
            SenderType::Admin,
            reply.admin_id.as_deref(),
            &reply.message,
        )
        .await
    {
        Ok(message_id) => {
            state.bus.publish(
                &Topic::conversation(conversation_id.clone()),
                BusEvent::MessageAppended {
                    conversation_id: conversation_id.clone(),
                    message: StoredMessage {
                        id: message_id.clone(),
                        conversation_id,
                        sender_type: SenderType::Admin,
                        sender_id: reply.admin_id,
                        message: reply.message,
                        created_at: chrono::Utc::now().to_rfc3339(),
                    },
                },
            );
            Json(serde_json::json!({ "id": message_id })).into_response()
        }
        Err(e) => error_response(&e, None),
    }
}

/// `POST /admin/conversations/{id}/claim`: take the conversation over.
pub async fn post_claim(
    State(state): State<RelayState>,
    Path(conversation_id): Path<String>,
    Json(claim): Json<ClaimRequest>,
) -> Response {
    match state
        .store
        .claim_conversation(&conversation_id, &claim.admin_id)
        .await
    {
        Ok(()) => {
            info!(
                conversation = %id_prefix(&conversation_id),
                "conversation claimed by an agent"
            );
            state.bus.publish(
                &Topic::conversation(conversation_id.clone()),
                BusEvent::StatusChanged {
                    conversation_id,
                    status: ConversationStatus::Active,
                    assigned_admin_id: Some(claim.admin_id),
                },
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(&e, None),
    }
}

/// `POST /admin/conversations/{id}/close`: terminal.
pub async fn post_close(
    State(state): State<RelayState>,
    Path(conversation_id): Path<String>,
) -> Response {
    match state.store.close_conversation(&conversation_id).await {
        Ok(()) => {
            info!(
                conversation = %id_prefix(&conversation_id),
                "conversation closed"
            );
            state.bus.publish(
                &Topic::conversation(conversation_id.clone()),
                BusEvent::StatusChanged {
                    conversation_id,
                    status: ConversationStatus::Closed,
                    assigned_admin_id: None,
                },
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(&e, None),
    }
}

/// `POST /admin/conversations/{id}/typing`: broadcast agent typing.
pub async fn post_typing(
    State(state): State<RelayState>,
    Path(conversation_id): Path<String>,
) -> Response {
    state.bus.publish(
        &Topic::typing(TypingDirection::Admin, conversation_id),
        BusEvent::Typing(TypingEvent::now(TypingDirection::Admin)),
    );
    sotto_metrics::record_typing(TypingDirection::Admin);
    StatusCode::NO_CONTENT.into_response()
}

/// `GET /admin/conversations/{id}/typing`: SSE of visitor typing.
pub async fn get_typing(
    State(state): State<RelayState>,
    Path(conversation_id): Path<String>,
) -> Response {
    let subscription = state
        .bus
        .subscribe(Topic::typing(TypingDirection::User, conversation_id));
    bus_events(subscription).into_response()
}

/// `GET /admin/conversations/{id}/events`: SSE of conversation events.
pub async fn get_events(
    State(state): State<RelayState>,
    Path(conversation_id): Path<String>,
) -> Response {
    let subscription = state.bus.subscribe(Topic::conversation(conversation_id));
    bus_events(subscription).into_response()
}
