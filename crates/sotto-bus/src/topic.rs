// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed bus topics.

use sotto_core::TypingDirection;

/// A bus topic. Closed set: subscribers and publishers agree on these at the
/// type level instead of matching on ad hoc strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Durable-state changes for one conversation (messages appended,
    /// status/assignment changes).
    Conversation { conversation_id: String },
    /// Ephemeral typing signals from one side of one conversation.
    Typing {
        direction: TypingDirection,
        conversation_id: String,
    },
}

impl Topic {
    pub fn conversation(conversation_id: impl Into<String>) -> Self {
        Topic::Conversation {
            conversation_id: conversation_id.into(),
        }
    }

    pub fn typing(direction: TypingDirection, conversation_id: impl Into<String>) -> Self {
        Topic::Typing {
            direction,
            conversation_id: conversation_id.into(),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::Conversation { conversation_id } => {
                write!(f, "conversation:{conversation_id}")
            }
            Topic::Typing {
                direction,
                conversation_id,
            } => write!(f, "typing:{direction}:{conversation_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_topic_naming_scheme() {
        assert_eq!(Topic::conversation("c1").to_string(), "conversation:c1");
        assert_eq!(
            Topic::typing(TypingDirection::User, "c1").to_string(),
            "typing:user:c1"
        );
        assert_eq!(
            Topic::typing(TypingDirection::Admin, "c1").to_string(),
            "typing:admin:c1"
        );
    }

    #[test]
    fn typing_directions_are_distinct_topics() {
        let user = Topic::typing(TypingDirection::User, "c1");
        let admin = Topic::typing(TypingDirection::Admin, "c1");
        assert_ne!(user, admin);
    }
}
