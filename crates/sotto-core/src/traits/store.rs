// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store trait for the external row-oriented datastore.

use async_trait::async_trait;

use crate::error::SottoError;
use crate::traits::adapter::ServiceAdapter;
use crate::types::{Conversation, ConversationStatus, SenderType, StoredMessage, VisitorSession};

/// Adapter for the external conversation/message datastore.
///
/// The store is opaque beyond this contract: the relay never issues raw
/// queries, only these RPC-shaped operations. Conversations are never
/// hard-deleted and messages are append-only.
#[async_trait]
pub trait ConversationStore: ServiceAdapter {
    /// Allocates a conversation owned by `visitor_id` and mints its session
    /// token. The token is returned exactly once, here.
    async fn create_visitor_conversation(
        &self,
        visitor_id: &str,
    ) -> Result<VisitorSession, SottoError>;

    /// Resolves a session token to its single conversation.
    ///
    /// Fails with [`SottoError::NotFound`] for unknown tokens; a token must
    /// never resolve to more than one conversation.
    async fn get_visitor_conversation(
        &self,
        session_token: &str,
    ) -> Result<Conversation, SottoError>;

    /// Full message history for the token's conversation, oldest first.
    async fn get_visitor_messages(
        &self,
        session_token: &str,
    ) -> Result<Vec<StoredMessage>, SottoError>;

    /// Appends a visitor-authored message, returning the new message id.
    async fn send_visitor_message(
        &self,
        session_token: &str,
        message: &str,
    ) -> Result<String, SottoError>;

    /// Fetches a conversation by id.
    ///
    /// The AI path calls this on every request to re-check
    /// `assigned_admin_id`; results must never be cached across requests.
    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, SottoError>;

    /// Full message history for a conversation by id, oldest first. Admin
    /// side only; visitors go through their session token.
    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, SottoError>;

    /// Appends a message on behalf of any sender, returning the new message id.
    async fn append_message(
        &self,
        conversation_id: &str,
        sender: SenderType,
        sender_id: Option<&str>,
        message: &str,
    ) -> Result<String, SottoError>;

    /// Sets the stored status. Transition legality is the caller's concern;
    /// the store only refuses writes to closed conversations.
    async fn set_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> Result<(), SottoError>;

    /// Claims the conversation for `admin_id`.
    ///
    /// Fails with [`SottoError::AgentTakeoverConflict`] when another admin
    /// already holds it and [`SottoError::ConversationClosed`] when closed.
    async fn claim_conversation(
        &self,
        conversation_id: &str,
        admin_id: &str,
    ) -> Result<(), SottoError>;

    /// Closes the conversation. Terminal; idempotent.
    async fn close_conversation(&self, conversation_id: &str) -> Result<(), SottoError>;

    /// Conversations with status `active` or `waiting_for_agent`,
    /// newest-updated first.
    async fn list_open_conversations(&self) -> Result<Vec<Conversation>, SottoError>;
}
