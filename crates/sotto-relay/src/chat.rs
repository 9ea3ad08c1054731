// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `POST /encrypted-chat-ai`: the encrypted AI relay pipeline.
//!
//! Admission order is fixed: decrypt the envelope, then the IP gate, then
//! the conversation gate, then the takeover/closed checks, then the handoff
//! short-circuit, and only then the concurrency slot and the upstream call.
//! Every gate fires before any upstream token is spent.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use sotto_bus::{BusEvent, Topic};
use sotto_core::{ChatMessage, ChatRole, Conversation, LimitScope, SenderType, SottoError, StoredMessage};
use sotto_crypto::{Envelope, open_payload, seal_payload};
use sotto_limiter::SATURATED_RETRY_AFTER;
use sotto_metrics::RequestOutcome;
use sotto_session::ServingState;
use sotto_session::identity::id_prefix;
use tracing::{info, warn};

use crate::error::error_response;
use crate::extract::{RequestCrypto, caller_ip, session_token};
use crate::sse::{StreamContext, relay_completion};
use crate::state::RelayState;

/// Canned assistant reply sent when the caller is handed to a human.
pub const HANDOFF_ACK: &str =
    "I'm connecting you with our support team now. A human agent will be with you shortly.";

/// The decrypted chat request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HandoffResponse {
    message: &'static str,
    agent_requested: bool,
}

pub async fn post_encrypted_chat(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let crypto = RequestCrypto::from_headers(&headers, &state.keyring);

    let request = match parse_request(&body, &crypto) {
        Ok(request) => request,
        Err(e) => {
            sotto_metrics::record_request(RequestOutcome::Rejected);
            return error_response(&e, Some(&crypto));
        }
    };

    // IP gate first: cheapest, and it caps everything downstream.
    let ip = caller_ip(&headers);
    let ip_decision = state.limiter.check_ip(&ip);
    if !ip_decision.allowed {
        sotto_metrics::record_rate_limited(LimitScope::Ip);
        sotto_metrics::record_request(RequestOutcome::Rejected);
        return error_response(
            &SottoError::RateLimitExceeded {
                scope: LimitScope::Ip,
                retry_after: state.limiter.ip_retry_after(&ip),
            },
            Some(&crypto),
        );
    }

    // Resolve the conversation, when the caller named one. A fresh fetch on
    // every request: agent assignment must be observed immediately.
    let conversation = match resolve_conversation(&state, &headers, &request).await {
        Ok(conversation) => conversation,
        Err(e) => {
            sotto_metrics::record_request(RequestOutcome::Rejected);
            return error_response(&e, Some(&crypto));
        }
    };

    let serving = match &conversation {
        Some(conversation) => {
            let decision = state.limiter.check_conversation(&conversation.id);
            if !decision.allowed {
                sotto_metrics::record_rate_limited(LimitScope::Conversation);
                sotto_metrics::record_request(RequestOutcome::Rejected);
                return error_response(
                    &SottoError::RateLimitExceeded {
                        scope: LimitScope::Conversation,
                        retry_after: state.limiter.conversation_retry_after(&conversation.id),
                    },
                    Some(&crypto),
                );
            }

            match ServingState::admit_ai_request(conversation) {
                Ok(serving) => Some(serving),
                Err(e) => {
                    info!(
                        conversation = %id_prefix(&conversation.id),
                        "ai path refused: {e}"
                    );
                    sotto_metrics::record_request(RequestOutcome::Rejected);
                    return error_response(&e, Some(&crypto));
                }
            }
        }
        None => None,
    };

    // Handoff short-circuit: never open an upstream stream for a caller who
    // asked for (or is already waiting on) a human.
    if let (Some(conversation), Some(serving)) = (&conversation, serving) {
        let wants_agent = serving == ServingState::WaitingForAgent
            || latest_user_message(&request)
                .and_then(|m| state.classifier.classify(m))
                .inspect(|verdict| {
                    info!(
                        conversation = %id_prefix(&conversation.id),
                        pattern = verdict.matched,
                        "handoff keyword matched"
                    );
                })
                .is_some();

        if wants_agent {
            return match handle_handoff(&state, conversation, serving).await {
                Ok(()) => {
                    sotto_metrics::record_request(RequestOutcome::Handoff);
                    sotto_metrics::record_latency(started.elapsed().as_secs_f64());
                    respond_handoff(&crypto)
                }
                Err(e) => {
                    sotto_metrics::record_request(RequestOutcome::Error);
                    error_response(&e, Some(&crypto))
                }
            };
        }
    }

    // Last gate: the global concurrency slot, held by the stream itself.
    let Some(slot) = state.limiter.gauge().try_acquire() else {
        sotto_metrics::record_stream_saturated();
        sotto_metrics::record_request(RequestOutcome::Rejected);
        return error_response(
            &SottoError::ConcurrencyExhausted {
                retry_after: SATURATED_RETRY_AFTER,
            },
            Some(&crypto),
        );
    };

    let upstream = match state.gateway.stream_completion(request.messages).await {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(error = %e, "upstream refused the completion request");
            sotto_metrics::record_request(RequestOutcome::Error);
            return error_response(&e, Some(&crypto));
        }
    };

    let encrypted = crypto.encrypted;
    let sse = relay_completion(
        upstream,
        StreamContext {
            store: state.store.clone(),
            bus: state.bus.clone(),
            conversation_id: conversation.map(|c| c.id),
            slot,
            key: encrypted.then(|| crypto.key.clone()),
            started,
        },
    );

    let mut response = sse.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = ip_decision.remaining.to_string().parse() {
        headers.insert("x-ratelimit-remaining", value);
    }
    if encrypted {
        headers.insert("x-encrypted", axum::http::HeaderValue::from_static("true"));
    }
    response
}

fn parse_request(body: &Bytes, crypto: &RequestCrypto) -> Result<ChatRequest, SottoError> {
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

/// Session token (body, then header) outranks a bare conversation id.
async fn resolve_conversation(
    state: &RelayState,
    headers: &HeaderMap,
    request: &ChatRequest,
) -> Result<Option<Conversation>, SottoError> {
    if let Some(token) = request
        .session_token
        .as_deref()
        .or_else(|| session_token(headers))
    {
        return state.store.get_visitor_conversation(token).await.map(Some);
    }
    if let Some(conversation_id) = &request.conversation_id {
        return state.store.get_conversation(conversation_id).await.map(Some);
    }
    Ok(None)
}

fn latest_user_message(request: &ChatRequest) -> Option<&str> {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::User)
        .map(|m| m.content.as_str())
}

/// Escalate to `waiting_for_agent` and append the canned acknowledgment.
async fn handle_handoff(
    state: &RelayState,
    conversation: &Conversation,
    serving: ServingState,
) -> Result<(), SottoError> {
    if serving == ServingState::AiServing {
        let next = serving.transition(ServingState::WaitingForAgent, &conversation.id)?;
        state.store.set_status(&conversation.id, next).await?;
        state.bus.publish(
            &Topic::conversation(conversation.id.clone()),
            BusEvent::StatusChanged {
                conversation_id: conversation.id.clone(),
                status: next,
                assigned_admin_id: None,
            },
        );
        info!(
            conversation = %id_prefix(&conversation.id),
            "conversation escalated to waiting_for_agent"
        );
    }

    let message_id = state
        .store
        .append_message(&conversation.id, SenderType::Ai, None, HANDOFF_ACK)
        .await?;
    state.bus.publish(
        &Topic::conversation(conversation.id.clone()),
        BusEvent::MessageAppended {
            conversation_id: conversation.id.clone(),
            message: StoredMessage {
                id: message_id,
                conversation_id: conversation.id.clone(),
                sender_type: SenderType::Ai,
                sender_id: None,
                message: HANDOFF_ACK.to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        },
    );
    Ok(())
}

fn respond_handoff(crypto: &RequestCrypto) -> Response {
    let body = HandoffResponse {
        message: HANDOFF_ACK,
        agent_requested: true,
    };
    if crypto.encrypted {
        match seal_payload(&body, &crypto.key) {
            Ok(envelope) => {
                return (
                    StatusCode::OK,
                    [("x-encrypted", "true")],
                    Json(envelope),
                )
                    .into_response();
            }
            Err(e) => warn!(error = %e, "failed to seal handoff response"),
        }
    }
    (StatusCode::OK, Json(serde_json::json!({
        "message": body.message,
        "agentRequested": body.agent_requested,
    })))
        .into_response()
}
