// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Visitor-facing routes, all keyed by the `x-session-token` header.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use sotto_bus::{BusEvent, Topic};
use sotto_core::{Conversation, SenderType, SottoError, StoredMessage, TypingDirection, TypingEvent};
use sotto_crypto::{Envelope, open_payload};
use sotto_session::VisitorIdentity;
use sotto_session::identity::id_prefix;
use tracing::info;

use crate::error::error_response;
use crate::extract::{RequestCrypto, session_token};
use crate::sse::bus_events;
use crate::state::RelayState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    conversation_id: String,
    session_token: String,
}

#[derive(Debug, Deserialize)]
struct VisitorMessage {
    message: String,
}

/// `POST /visitor/session`: mint a fresh anonymous session.
pub async fn post_session(State(state): State<RelayState>) -> Response {
    match VisitorIdentity::new(&*state.store).create_session().await {
        Ok(session) => Json(SessionResponse {
            conversation_id: session.conversation_id,
            session_token: session.session_token,
        })
        .into_response(),
        Err(e) => error_response(&e, None),
    }
}

/// `GET /visitor/conversation`: resolve the caller's own conversation.
pub async fn get_conversation(State(state): State<RelayState>, headers: HeaderMap) -> Response {
    match resolve(&state, &headers).await {
        Ok(conversation) => Json(conversation).into_response(),
        Err(e) => error_response(&e, None),
    }
}

/// `GET /visitor/messages`: full history, oldest first.
pub async fn get_messages(State(state): State<RelayState>, headers: HeaderMap) -> Response {
    let Some(token) = session_token(&headers) else {
        return error_response(&SottoError::Unauthorized, None);
    };
    match state.store.get_visitor_messages(token).await {
        Ok(messages) => Json(messages).into_response(),
        Err(e) => error_response(&e, None),
    }
}

/// `POST /visitor/messages`: append a visitor message.
///
/// Honors the encryption envelope when `x-encrypted: true` is set.
pub async fn post_messages(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let crypto = RequestCrypto::from_headers(&headers, &state.keyring);
    let Some(token) = session_token(&headers).map(str::to_string) else {
        return error_response(&SottoError::Unauthorized, Some(&crypto));
    };

    let message = match parse_message(&body, &crypto) {
        Ok(message) => message,
        Err(e) => return error_response(&e, Some(&crypto)),
    };

    let conversation = match resolve(&state, &headers).await {
        Ok(conversation) => conversation,
        Err(e) => return error_response(&e, Some(&crypto)),
    };

    match state
        .store
        .send_visitor_message(&token, &message.message)
        .await
    {
        Ok(message_id) => {
            state.bus.publish(
                &Topic::conversation(conversation.id.clone()),
                BusEvent::MessageAppended {
                    conversation_id: conversation.id.clone(),
                    message: StoredMessage {
                        id: message_id.clone(),
                        conversation_id: conversation.id.clone(),
                        sender_type: SenderType::Visitor,
                        sender_id: conversation.visitor_id.clone(),
                        message: message.message,
                        created_at: chrono::Utc::now().to_rfc3339(),
                    },
                },
            );
            Json(serde_json::json!({ "id": message_id })).into_response()
        }
        Err(e) => error_response(&e, Some(&crypto)),
    }
}

/// `POST /visitor/typing`: broadcast a visitor-side typing signal.
pub async fn post_typing(State(state): State<RelayState>, headers: HeaderMap) -> Response {
    match resolve(&state, &headers).await {
        Ok(conversation) => {
            state.bus.publish(
                &Topic::typing(TypingDirection::User, conversation.id.clone()),
                BusEvent::Typing(TypingEvent::now(TypingDirection::User)),
            );
            sotto_metrics::record_typing(TypingDirection::User);
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => error_response(&e, None),
    }
}

/// `GET /visitor/typing`: SSE of agent-side typing signals.
pub async fn get_typing(State(state): State<RelayState>, headers: HeaderMap) -> Response {
    match resolve(&state, &headers).await {
        Ok(conversation) => {
            let subscription = state
                .bus
                .subscribe(Topic::typing(TypingDirection::Admin, conversation.id));
            bus_events(subscription).into_response()
        }
        Err(e) => error_response(&e, None),
    }
}

/// `GET /visitor/events`: SSE of conversation events (messages, status).
pub async fn get_events(State(state): State<RelayState>, headers: HeaderMap) -> Response {
    match resolve(&state, &headers).await {
        Ok(conversation) => {
            info!(
                conversation = %id_prefix(&conversation.id),
                "visitor event stream opened"
            );
            let subscription = state.bus.subscribe(Topic::conversation(conversation.id));
            bus_events(subscription).into_response()
        }
        Err(e) => error_response(&e, None),
    }
}

async fn resolve(state: &RelayState, headers: &HeaderMap) -> Result<Conversation, SottoError> {
    let token = session_token(headers).ok_or(SottoError::Unauthorized)?;
    VisitorIdentity::new(&*state.store).resolve(token).await
}

fn parse_message(body: &Bytes, crypto: &RequestCrypto) -> Result<VisitorMessage, SottoError> {
    if crypto.encrypted {
        let envelope: Envelope =
            serde_json::from_slice(body).map_err(|_| SottoError::DecryptionFailure {
                detail: "request body is not an encryption envelope".to_string(),
            })?;
        open_payload(&envelope, &crypto.key)
    } else {
        serde_json::from_slice(body).map_err(|_| SottoError::DecryptionFailure {
            detail: "request body is not valid JSON".to_string(),
        })
    }
}
