// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping [`SottoError`] to HTTP responses.
//!
//! Error bodies are `{"error": "<message>"}` with an optional `"code"`
//! field. In encrypted mode the body is sealed into the same envelope as
//! successful responses, so errors never leak operational detail over the
//! wire unencrypted. Server-side failures log the real error and answer
//! with a generic message.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sotto_core::SottoError;
use sotto_crypto::{DerivedKey, seal_payload};
use tracing::error;

use crate::extract::RequestCrypto;

/// Machine-readable code for agent takeover.
pub const CODE_AGENT_ASSIGNED: &str = "AGENT_ASSIGNED";
/// Machine-readable code for a closed conversation.
pub const CODE_CONVERSATION_CLOSED: &str = "CONVERSATION_CLOSED";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

/// The wire-visible shape of one error.
struct Rendered {
    status: StatusCode,
    message: String,
    code: Option<&'static str>,
    retry_after: Option<u64>,
}

fn render(err: &SottoError) -> Rendered {
    match err {
        SottoError::DecryptionFailure { .. } => Rendered {
            status: StatusCode::BAD_REQUEST,
            message: "Unable to decrypt request.".to_string(),
            code: None,
            retry_after: None,
        },
        SottoError::RateLimitExceeded { retry_after, .. } => Rendered {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "Rate limit exceeded. Please try again later.".to_string(),
            code: None,
            retry_after: Some(retry_after.as_secs()),
        },
        SottoError::ConcurrencyExhausted { retry_after } => Rendered {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "Service is busy. Please try again shortly.".to_string(),
            code: None,
            retry_after: Some(retry_after.as_secs()),
        },
        SottoError::AgentTakeoverConflict { .. } => Rendered {
            status: StatusCode::CONFLICT,
            message: "A live agent is handling this conversation.".to_string(),
            code: Some(CODE_AGENT_ASSIGNED),
            retry_after: None,
        },
        SottoError::ConversationClosed { .. } => Rendered {
            status: StatusCode::CONFLICT,
            message: "This conversation is closed. Please start a new one.".to_string(),
            code: Some(CODE_CONVERSATION_CLOSED),
            retry_after: None,
        },
        SottoError::UpstreamRateLimited => Rendered {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: "The assistant is busy. Please try again later.".to_string(),
            code: None,
            retry_after: None,
        },
        SottoError::UpstreamBilling => Rendered {
            status: StatusCode::PAYMENT_REQUIRED,
            message: "Payment required.".to_string(),
            code: None,
            retry_after: None,
        },
        SottoError::NotFound { what } => Rendered {
            status: StatusCode::NOT_FOUND,
            message: format!("{what} not found"),
            code: None,
            retry_after: None,
        },
        SottoError::Unauthorized => Rendered {
            status: StatusCode::UNAUTHORIZED,
            message: "Unauthorized.".to_string(),
            code: None,
            retry_after: None,
        },
        SottoError::UpstreamGateway { .. }
        | SottoError::Store { .. }
        | SottoError::Config(_)
        | SottoError::Internal(_) => {
            error!(error = %err, "internal relay error");
            Rendered {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An unexpected error occurred.".to_string(),
                code: None,
                retry_after: None,
            }
        }
    }
}

/// Build the error response, sealing the body when the request was encrypted.
pub fn error_response(err: &SottoError, crypto: Option<&RequestCrypto>) -> Response {
    let rendered = render(err);
    let body = ErrorBody {
        error: rendered.message,
        code: rendered.code,
    };

    let mut response = match crypto {
        Some(c) if c.encrypted => sealed_body(&body, &c.key)
            .map(|envelope| {
                (
                    rendered.status,
                    [("x-encrypted", "true")],
                    Json(envelope),
                )
                    .into_response()
            })
            .unwrap_or_else(|| (rendered.status, Json(body)).into_response()),
        _ => (rendered.status, Json(body)).into_response(),
    };

    if let Some(secs) = rendered.retry_after {
        if let Ok(value) = secs.to_string().parse() {
            response.headers_mut().insert("retry-after", value);
        }
    }
    response
}

fn sealed_body(body: &ErrorBody, key: &DerivedKey) -> Option<sotto_crypto::Envelope> {
    match seal_payload(body, key) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            // Sealing an error body should never fail; fall back to plain.
            error!(error = %e, "failed to seal error body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use sotto_core::LimitScope;

    use super::*;

    #[test]
    fn takeover_conflict_maps_to_409_with_code() {
        let rendered = render(&SottoError::AgentTakeoverConflict {
            conversation_id: "c1".into(),
        });
        assert_eq!(rendered.status, StatusCode::CONFLICT);
        assert_eq!(rendered.code, Some(CODE_AGENT_ASSIGNED));
    }

    #[test]
    fn closed_conversation_maps_to_409_with_code() {
        let rendered = render(&SottoError::ConversationClosed {
            conversation_id: "c1".into(),
        });
        assert_eq!(rendered.status, StatusCode::CONFLICT);
        assert_eq!(rendered.code, Some(CODE_CONVERSATION_CLOSED));
    }

    #[test]
    fn rate_limit_carries_retry_after_seconds() {
        let rendered = render(&SottoError::RateLimitExceeded {
            scope: LimitScope::Ip,
            retry_after: Duration::from_secs(3600),
        });
        assert_eq!(rendered.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rendered.retry_after, Some(3600));
    }

    #[test]
    fn saturation_maps_to_503() {
        let rendered = render(&SottoError::ConcurrencyExhausted {
            retry_after: Duration::from_secs(30),
        });
        assert_eq!(rendered.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rendered.retry_after, Some(30));
    }

    #[test]
    fn server_side_errors_never_echo_detail() {
        let rendered = render(&SottoError::Internal(
            "connection refused to 10.1.2.3:5432".to_string(),
        ));
        assert_eq!(rendered.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!rendered.message.contains("10.1.2.3"));

        let rendered = render(&SottoError::Store {
            message: "rpc get_conversation returned 500: secret detail".to_string(),
            source: None,
        });
        assert!(!rendered.message.contains("secret detail"));
    }

    #[test]
    fn billing_failures_use_the_fixed_body() {
        let rendered = render(&SottoError::UpstreamBilling);
        assert_eq!(rendered.status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(rendered.message, "Payment required.");
    }
}
