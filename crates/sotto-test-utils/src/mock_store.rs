// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ConversationStore`] for deterministic testing.
//!
//! Mints real session tokens and enforces the same claim/close semantics as
//! the external store, so scenario tests exercise the relay against faithful
//! storage behavior without a network.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use sotto_core::{
    Conversation, ConversationStatus, ConversationStore, HealthStatus, SenderType, ServiceAdapter,
    SottoError, StoredMessage, VisitorSession,
};
use sotto_session::mint_session_token;

/// A mock conversation store backed by `DashMap`s.
#[derive(Default)]
pub struct MockStore {
    conversations: DashMap<String, Conversation>,
    tokens: DashMap<String, String>,
    messages: DashMap<String, Vec<StoredMessage>>,
    next_message_id: AtomicU64,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct mutation for takeover scenarios: sets `assigned_admin_id`
    /// without going through `claim_conversation`, simulating an out-of-band
    /// claim landing while a stream is open.
    pub fn assign_admin(&self, conversation_id: &str, admin_id: &str) {
        if let Some(mut conversation) = self.conversations.get_mut(conversation_id) {
            conversation.assigned_admin_id = Some(admin_id.to_string());
        }
    }

    /// Direct mutation to force a status, bypassing transition checks.
    pub fn force_status(&self, conversation_id: &str, status: ConversationStatus) {
        if let Some(mut conversation) = self.conversations.get_mut(conversation_id) {
            conversation.status = status;
        }
    }

    /// All stored messages for a conversation, oldest first.
    pub fn messages_for(&self, conversation_id: &str) -> Vec<StoredMessage> {
        self.messages
            .get(conversation_id)
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// The stored conversation row, when it exists.
    pub fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        self.conversations.get(conversation_id).map(|c| c.clone())
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    fn push_message(
        &self,
        conversation_id: &str,
        sender: SenderType,
        sender_id: Option<&str>,
        message: &str,
    ) -> String {
        let id = format!("m{}", self.next_message_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.messages
            .entry(conversation_id.to_string())
            .or_default()
            .push(StoredMessage {
                id: id.clone(),
                conversation_id: conversation_id.to_string(),
                sender_type: sender,
                sender_id: sender_id.map(str::to_string),
                message: message.to_string(),
                created_at: Self::now(),
            });
        if let Some(mut conversation) = self.conversations.get_mut(conversation_id) {
            conversation.updated_at = Self::now();
        }
        id
    }

    fn conversation_for_token(&self, session_token: &str) -> Result<Conversation, SottoError> {
        let conversation_id = self
            .tokens
            .get(session_token)
            .map(|id| id.clone())
            .ok_or_else(|| SottoError::NotFound {
                what: "conversation".to_string(),
            })?;
        self.conversation(&conversation_id)
            .ok_or_else(|| SottoError::NotFound {
                what: "conversation".to_string(),
            })
    }
}

#[async_trait]
impl ServiceAdapter for MockStore {
    fn name(&self) -> &str {
        "mock-store"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SottoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ConversationStore for MockStore {
    async fn create_visitor_conversation(
        &self,
        visitor_id: &str,
    ) -> Result<VisitorSession, SottoError> {
        let conversation_id = uuid::Uuid::new_v4().to_string();
        let session_token = mint_session_token()?;

        self.conversations.insert(
            conversation_id.clone(),
            Conversation {
                id: conversation_id.clone(),
                visitor_id: Some(visitor_id.to_string()),
                user_id: None,
                status: ConversationStatus::Active,
                assigned_admin_id: None,
                created_at: Self::now(),
                updated_at: Self::now(),
            },
        );
        self.tokens
            .insert(session_token.clone(), conversation_id.clone());

        Ok(VisitorSession {
            conversation_id,
            session_token,
        })
    }

    async fn get_visitor_conversation(
        &self,
        session_token: &str,
    ) -> Result<Conversation, SottoError> {
        self.conversation_for_token(session_token)
    }

    async fn get_visitor_messages(
        &self,
        session_token: &str,
    ) -> Result<Vec<StoredMessage>, SottoError> {
        let conversation = self.conversation_for_token(session_token)?;
        Ok(self.messages_for(&conversation.id))
    }

    async fn send_visitor_message(
        &self,
        session_token: &str,
        message: &str,
    ) -> Result<String, SottoError> {
        let conversation = self.conversation_for_token(session_token)?;
        Ok(self.push_message(
            &conversation.id,
            SenderType::Visitor,
            conversation.visitor_id.as_deref(),
            message,
        ))
    }

    async fn get_conversation(&self, conversation_id: &str) -> Result<Conversation, SottoError> {
        self.conversation(conversation_id)
            .ok_or_else(|| SottoError::NotFound {
                what: "conversation".to_string(),
            })
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, SottoError> {
        Ok(self.messages_for(conversation_id))
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        sender: SenderType,
        sender_id: Option<&str>,
        message: &str,
    ) -> Result<String, SottoError> {
        if self.conversation(conversation_id).is_none() {
            return Err(SottoError::NotFound {
                what: "conversation".to_string(),
            });
        }
        Ok(self.push_message(conversation_id, sender, sender_id, message))
    }

    async fn set_status(
        &self,
        conversation_id: &str,
        status: ConversationStatus,
    ) -> Result<(), SottoError> {
        let mut conversation =
            self.conversations
                .get_mut(conversation_id)
                .ok_or_else(|| SottoError::NotFound {
                    what: "conversation".to_string(),
                })?;
        if conversation.status == ConversationStatus::Closed {
            return Err(SottoError::ConversationClosed {
                conversation_id: conversation_id.to_string(),
            });
        }
        conversation.status = status;
        conversation.updated_at = Self::now();
        Ok(())
    }

    async fn claim_conversation(
        &self,
        conversation_id: &str,
        admin_id: &str,
    ) -> Result<(), SottoError> {
        let mut conversation =
            self.conversations
                .get_mut(conversation_id)
                .ok_or_else(|| SottoError::NotFound {
                    what: "conversation".to_string(),
                })?;
        if conversation.status == ConversationStatus::Closed {
            return Err(SottoError::ConversationClosed {
                conversation_id: conversation_id.to_string(),
            });
        }
        match &conversation.assigned_admin_id {
            Some(existing) if existing != admin_id => Err(SottoError::AgentTakeoverConflict {
                conversation_id: conversation_id.to_string(),
            }),
            _ => {
                conversation.assigned_admin_id = Some(admin_id.to_string());
                conversation.status = ConversationStatus::Active;
                conversation.updated_at = Self::now();
                Ok(())
            }
        }
    }

    async fn close_conversation(&self, conversation_id: &str) -> Result<(), SottoError> {
        let mut conversation =
            self.conversations
                .get_mut(conversation_id)
                .ok_or_else(|| SottoError::NotFound {
                    what: "conversation".to_string(),
                })?;
        conversation.status = ConversationStatus::Closed;
        conversation.updated_at = Self::now();
        Ok(())
    }

    async fn list_open_conversations(&self) -> Result<Vec<Conversation>, SottoError> {
        let mut open: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|entry| entry.status != ConversationStatus::Closed)
            .map(|entry| entry.clone())
            .collect();
        open.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(open)
    }
}
