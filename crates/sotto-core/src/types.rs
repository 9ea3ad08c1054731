// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Sotto relay.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who authored a stored message.
///
/// Closed set: routing logic matches exhaustively on this, so an unknown
/// sender is a deserialization error rather than a silently ignored string.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    /// An authenticated, logged-in user.
    User,
    /// An anonymous visitor identified only by a session token.
    Visitor,
    /// A human support agent.
    Admin,
    /// The AI assistant.
    Ai,
}

/// Stored conversation status.
///
/// The richer serving state (who currently answers) is derived from this
/// together with `assigned_admin_id`; see `sotto-session`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    WaitingForAgent,
    Closed,
}

/// A conversation row as returned by the external store.
///
/// `visitor_id` and `user_id` are mutually exclusive owners. The visitor
/// session token is deliberately absent: the store never returns it after
/// creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub visitor_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub status: ConversationStatus,
    #[serde(default)]
    pub assigned_admin_id: Option<String>,
    /// ISO 8601 timestamp.
    pub created_at: String,
    /// ISO 8601 timestamp.
    pub updated_at: String,
}

impl Conversation {
    /// True once a human agent has claimed this conversation.
    pub fn agent_assigned(&self) -> bool {
        self.assigned_admin_id.is_some()
    }
}

/// A message row as returned by the external store. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_type: SenderType,
    #[serde(default)]
    pub sender_id: Option<String>,
    pub message: String,
    /// ISO 8601 timestamp; total order within a conversation.
    pub created_at: String,
}

/// The result of minting a new anonymous visitor session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorSession {
    pub conversation_id: String,
    pub session_token: String,
}

/// Role of a chat message sent to the completion gateway.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One turn of the transcript sent to the completion gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Which side of the conversation a typing event (or typing topic) belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TypingDirection {
    /// The visitor/user side.
    User,
    /// The agent side.
    Admin,
}

/// Ephemeral "is typing" signal. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingEvent {
    pub sender: TypingDirection,
    /// ISO 8601 timestamp of emission.
    pub timestamp: String,
}

impl TypingEvent {
    /// A typing event stamped with the current time.
    pub fn now(sender: TypingDirection) -> Self {
        Self {
            sender,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// One parsed chunk of the upstream completion stream.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    /// The raw `data:` payload exactly as the gateway framed it.
    pub raw: String,
    /// The text delta extracted from `choices[0].delta.content`, if any.
    pub delta: Option<String>,
}

/// Which rate-limit gate denied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LimitScope {
    Ip,
    Conversation,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}
