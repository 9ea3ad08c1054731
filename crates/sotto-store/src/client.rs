// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The [`StoreClient`] RPC implementation.
//!
//! Handles request construction, authentication, transient error retry
//! (once, on 429/500/503), and the `NotFound` mapping for unknown session
//! tokens and conversation ids.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use sotto_core::{
    Conversation, ConversationStatus, ConversationStore, HealthStatus, SenderType, ServiceAdapter,
    SottoError, StoredMessage, VisitorSession,
};
use tracing::{debug, warn};

/// HTTP client for the external conversation/message datastore.
///
/// Manages the service-key bearer header, connection pooling, and retry
/// logic for transient errors.
#[derive(Clone)]
pub struct StoreClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl StoreClient {
    /// Creates a new store client.
    ///
    /// `service_key`, when set, is sent as `Authorization: Bearer` on every
    /// RPC.
    pub fn new(
        base_url: impl Into<String>,
        service_key: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SottoError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        if let Some(key) = service_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| SottoError::Config(format!("invalid store service key: {e}")))?;
            value.set_sensitive(true);
            headers.insert("authorization", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SottoError::store("failed to build store HTTP client", e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Calls one store RPC, retrying once on transient status.
    async fn rpc<T: DeserializeOwned>(
        &self,
        name: &str,
        params: serde_json::Value,
    ) -> Result<T, SottoError> {
        let url = format!("{}/rpc/{name}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(rpc = name, attempt, "retrying store RPC after transient error");
                tokio::time::sleep(Duration::from_millis(250)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(&params)
                .send()
                .await
                .map_err(|e| SottoError::store(format!("store RPC {name} failed"), e))?;

            let status = response.status();
            debug!(rpc = name, status = %status, attempt, "store RPC response");

            if status.is_success() {
                // Some RPCs return no body; treat empty as JSON null.
                let body = response
                    .text()
                    .await
                    .map_err(|e| SottoError::store("failed to read store response", e))?;
                let body = if body.trim().is_empty() {
                    "null".to_string()
                } else {
                    body
                };
                return serde_json::from_str(&body)
                    .map_err(|e| SottoError::store(format!("malformed store response for {name}"), e));
            }

            if is_transient(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(rpc = name, status = %status, body = %body, "transient store error, will retry");
                last_error = Some(SottoError::Store {
                    message: format!("store RPC {name} returned {status}"),
                    source: None,
                });
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(SottoError::Store {
                message: format!("store RPC {name} returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| SottoError::Store {
            message: format!("store RPC {name} failed after retries"),
            source: None,
        }))
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

impl std::fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreClient")
            .field("base_url", &self.base_url)
            .field("service_key", &"[redacted]")
            .finish()
    }
}

#[async_trait]
impl ServiceAdapter for StoreClient {
    fn name(&self) -> &str {
        "store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SottoError> {
        // list_open is the cheapest RPC that exercises auth and routing.
        match self.list_open_conversations().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }
}

#[async_trait]
impl ConversationStore for StoreClient {
    async fn create_visitor_conversation(
        &self,
        visitor_id: &str,
    ) -> Result<VisitorSession, SottoError> {
        self.rpc(
            "create_visitor_conversation",
            serde_json::json!({ "p_visitor_id": visitor_id }),
        )
        .await
    }

    async fn get_visitor_conversation(
        &self,
        session_token: &str,
    ) -> Result<Conversation, SottoError> {
        let row: Option<Conversation> = self
            .rpc(
                "get_visitor_conversation",
                serde_json::json!({ "p_session_token": session_token }),
            )
            .await?;
        row.ok_or_else(|| SottoError::NotFound {
            what: "conversation".to_string(),
        })
    }

    async fn get_visitor_messages(
        &self,
        session_token: &str,
    ) -> Result<Vec<StoredMessage>, SottoError> {
        self.rpc(
            "get_visitor_messages",
            serde_json::json!({ "p_session_token": session_token }),
        )
        .await
    }

    async fn send_visitor_message(
        &self,
        session_token: &str,
        message: &str,
    ) -> Result<String, SottoError> {
        self.rpc(
            "send_visitor_message",
            serde_json::json!({
                "p_session_token": session_token,
                "p_message": message,
            }),
        )
        .await
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, SottoError> {
        let row: Option<Conversation> = self
            .rpc(
                "get_conversation",
                serde_json::json!({ "p_conversation_id": conversation_id }),
            )
            .await?;
        row.ok_or_else(|| SottoError::NotFound {
            what: "conversation".to_string(),
        })
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, SottoError> {
        self.rpc(
            "get_conversation_messages",
            serde_json::json!({ "p_conversation_id": conversation_id }),
        )
        .await
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        sender: SenderType,
        sender_id: Option<&str>,
        message: &str,
    ) -> Result<String, SottoError> {
        self.rpc(
            "append_message",
            serde_json::json!({
                "p_conversation_id": conversation_id,
                "p_sender_type": sender,
                "p_sender_id": sender_id,
                "p_message": message,
            }),
        )
        .await
    }

    async fn set_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> Result<(), SottoError> {
        let _: serde_json::Value = self
            .rpc(
                "set_status",
                serde_json::json!({
                    "p_conversation_id": conversation_id,
                    "p_status": status,
                }),
            )
            .await?;
        Ok(())
    }

    async fn claim_conversation(
        &self,
        conversation_id: &str,
        admin_id: &str,
    ) -> Result<(), SottoError> {
        // The store enforces the single-assignee invariant; 409 from it
        // means another admin got there first.
        let result: Result<serde_json::Value, SottoError> = self
            .rpc(
                "claim_conversation",
                serde_json::json!({
                    "p_conversation_id": conversation_id,
                    "p_admin_id": admin_id,
                }),
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(SottoError::Store { message, .. }) if message.contains("409") => {
                Err(SottoError::AgentTakeoverConflict {
                    conversation_id: conversation_id.to_string(),
                })
            }
            Err(SottoError::Store { message, .. }) if message.contains("410") => {
                Err(SottoError::ConversationClosed {
                    conversation_id: conversation_id.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn close_conversation(&self, conversation_id: &str) -> Result<(), SottoError> {
        let _: serde_json::Value = self
            .rpc(
                "close_conversation",
                serde_json::json!({ "p_conversation_id": conversation_id }),
            )
            .await?;
        Ok(())
    }

    async fn list_open_conversations(&self) -> Result<Vec<Conversation>, SottoError> {
        self.rpc("list_open_conversations", serde_json::json!({})).await
    }
}
