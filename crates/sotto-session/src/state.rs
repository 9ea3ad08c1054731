// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The conversation serving-state machine.
//!
//! The store persists `(status, assigned_admin_id)`; the serving state is
//! derived from that pair on every request, never cached, so an admin claim
//! between two requests is always observed. Transition legality lives here;
//! the stores only write what this module has approved.

use sotto_core::{Conversation, ConversationStatus, SottoError};

/// Who currently answers a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServingState {
    /// The AI responds; no agent requested or assigned.
    AiServing,
    /// The caller asked for a human; no agent has claimed yet. The AI stays
    /// silent apart from the handoff acknowledgment.
    WaitingForAgent,
    /// An agent holds the conversation; the AI path is barred.
    AgentServing,
    /// Terminal. Only a brand-new conversation continues the relationship.
    Closed,
}

impl ServingState {
    /// Derive the serving state from a stored row.
    ///
    /// Total over all `(status, assigned_admin_id)` pairs: a claimed
    /// conversation is agent-serving regardless of its stored status short
    /// of `closed`.
    pub fn of(conversation: &Conversation) -> Self {
        match (conversation.status, conversation.agent_assigned()) {
            (ConversationStatus::Closed, _) => ServingState::Closed,
            (_, true) => ServingState::AgentServing,
            (ConversationStatus::WaitingForAgent, false) => ServingState::WaitingForAgent,
            (ConversationStatus::Active, false) => ServingState::AiServing,
        }
    }

    /// Check whether the AI path may answer, enforcing the routing contract.
    ///
    /// Must be called on a freshly fetched row on every request.
    pub fn admit_ai_request(conversation: &Conversation) -> Result<Self, SottoError> {
        match Self::of(conversation) {
            ServingState::AgentServing => Err(SottoError::AgentTakeoverConflict {
                conversation_id: conversation.id.clone(),
            }),
            ServingState::Closed => Err(SottoError::ConversationClosed {
                conversation_id: conversation.id.clone(),
            }),
            state => Ok(state),
        }
    }

    /// Validate a transition to `next`, returning the stored status to
    /// write. Invalid transitions are typed errors, never panics.
    pub fn transition(
        self,
        next: ServingState,
        conversation_id: &str,
    ) -> Result<ConversationStatus, SottoError> {
        use ServingState::*;
        match (self, next) {
            // Escalation: the caller asked for a human.
            (AiServing, WaitingForAgent) => Ok(ConversationStatus::WaitingForAgent),
            // Claim, including a proactive claim before any request.
            (AiServing, AgentServing) | (WaitingForAgent, AgentServing) => {
                Ok(ConversationStatus::Active)
            }
            // Explicit close from any live state.
            (AiServing, Closed) | (WaitingForAgent, Closed) | (AgentServing, Closed) => {
                Ok(ConversationStatus::Closed)
            }
            // Self-transitions carry no write.
            (AiServing, AiServing)
            | (WaitingForAgent, WaitingForAgent)
            | (AgentServing, AgentServing)
            | (Closed, Closed) => Err(SottoError::Internal(format!(
                "no-op transition requested for conversation {conversation_id}"
            ))),
            (Closed, _) => Err(SottoError::ConversationClosed {
                conversation_id: conversation_id.to_string(),
            }),
            (AgentServing, _) => Err(SottoError::AgentTakeoverConflict {
                conversation_id: conversation_id.to_string(),
            }),
            (_, AiServing) => Err(SottoError::Internal(format!(
                "conversation {conversation_id} cannot return to AI serving"
            ))),
        }
    }
}

impl std::fmt::Display for ServingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServingState::AiServing => write!(f, "ai_serving"),
            ServingState::WaitingForAgent => write!(f, "waiting_for_agent"),
            ServingState::AgentServing => write!(f, "agent_serving"),
            ServingState::Closed => write!(f, "closed"),
        }
    }
}
