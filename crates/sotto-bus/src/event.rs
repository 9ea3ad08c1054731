// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events carried on the bus.

use serde::Serialize;
use sotto_core::{ConversationStatus, StoredMessage, TypingEvent};

/// A bus event. Serializes with a `type` tag for delivery as SSE JSON frames.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    /// A message was appended to the conversation.
    MessageAppended {
        conversation_id: String,
        message: StoredMessage,
    },
    /// Status and/or agent assignment changed.
    StatusChanged {
        conversation_id: String,
        status: ConversationStatus,
        assigned_admin_id: Option<String>,
    },
    /// One side is typing. Never persisted.
    Typing(TypingEvent),
}
