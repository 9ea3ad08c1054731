// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sotto relay.

use std::time::Duration;

use thiserror::Error;

use crate::types::LimitScope;

/// The primary error type used across all Sotto adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SottoError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed nonce/ciphertext or authentication-tag mismatch.
    ///
    /// Per-chunk failures are recoverable: the consumer skips the offending
    /// chunk and keeps reading the stream.
    #[error("decryption failure: {detail}")]
    DecryptionFailure { detail: String },

    /// An IP or per-conversation rate-limit gate denied the request.
    #[error("rate limit exceeded ({scope}), retry after {retry_after:?}")]
    RateLimitExceeded {
        scope: LimitScope,
        retry_after: Duration,
    },

    /// The global concurrent-stream gauge is saturated.
    #[error("too many concurrent streams, retry after {retry_after:?}")]
    ConcurrencyExhausted { retry_after: Duration },

    /// A human agent owns this conversation; the AI path must not respond.
    #[error("a live agent is handling conversation {conversation_id}")]
    AgentTakeoverConflict { conversation_id: String },

    /// The conversation is closed; the caller must mint a new session.
    #[error("conversation {conversation_id} is closed")]
    ConversationClosed { conversation_id: String },

    /// The completion gateway rejected the request with 429.
    #[error("upstream gateway rate limited")]
    UpstreamRateLimited,

    /// The completion gateway reported a billing failure (402).
    #[error("upstream gateway payment required")]
    UpstreamBilling,

    /// Any other completion gateway failure.
    #[error("upstream gateway error (status {status})")]
    UpstreamGateway {
        status: u16,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// External datastore RPC failure.
    #[error("store error: {message}")]
    Store {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unknown session token or conversation id.
    #[error("{what} not found")]
    NotFound { what: String },

    /// Missing or invalid credentials for an admin route.
    #[error("unauthorized")]
    Unauthorized,

    /// Internal or unexpected errors. Never echoed verbatim to callers.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SottoError {
    /// Shorthand for a store error wrapping an underlying cause.
    pub fn store<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SottoError::Store {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True when the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SottoError::RateLimitExceeded { .. }
                | SottoError::ConcurrencyExhausted { .. }
                | SottoError::UpstreamRateLimited
        )
    }
}
