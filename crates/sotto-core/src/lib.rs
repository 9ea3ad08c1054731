// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sotto encrypted chat relay.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Sotto workspace. The external store and
//! the upstream completion gateway are reached exclusively through the
//! adapter traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SottoError;
pub use types::{
    ChatMessage, ChatRole, Conversation, ConversationStatus, HealthStatus, LimitScope,
    SenderType, StoredMessage, StreamChunk, TypingDirection, TypingEvent, VisitorSession,
};

// Re-export all adapter traits at crate root.
pub use traits::{ChunkStream, CompletionGateway, ConversationStore, ServiceAdapter};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn sender_type_wire_strings_round_trip() {
        let variants = [
            SenderType::User,
            SenderType::Visitor,
            SenderType::Admin,
            SenderType::Ai,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = SenderType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
        assert_eq!(SenderType::Ai.to_string(), "ai");
        assert_eq!(SenderType::Visitor.to_string(), "visitor");
    }

    #[test]
    fn conversation_status_serializes_as_store_strings() {
        let json = serde_json::to_string(&ConversationStatus::WaitingForAgent).unwrap();
        assert_eq!(json, "\"waiting_for_agent\"");
        let parsed: ConversationStatus = serde_json::from_str("\"closed\"").unwrap();
        assert_eq!(parsed, ConversationStatus::Closed);
    }

    #[test]
    fn conversation_deserializes_store_row() {
        let row = r#"{
            "id": "7b0a3a6e-9c1f-4a6e-9d3c-2f1e8b5c4d7a",
            "visitor_id": "visitor_1700000000000_ab12cd34",
            "status": "active",
            "assigned_admin_id": null,
            "created_at": "2026-01-05T10:00:00+00:00",
            "updated_at": "2026-01-05T10:00:00+00:00"
        }"#;
        let conv: Conversation = serde_json::from_str(row).unwrap();
        assert_eq!(conv.status, ConversationStatus::Active);
        assert!(!conv.agent_assigned());
        assert!(conv.user_id.is_none());
    }

    #[test]
    fn chat_role_matches_gateway_wire_format() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn typing_event_carries_lowercase_sender() {
        let ev = TypingEvent::now(TypingDirection::Admin);
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"sender\":\"admin\""));
    }

    #[test]
    fn error_variants_construct() {
        let _config = SottoError::Config("test".into());
        let _decrypt = SottoError::DecryptionFailure {
            detail: "bad tag".into(),
        };
        let _rate = SottoError::RateLimitExceeded {
            scope: LimitScope::Ip,
            retry_after: std::time::Duration::from_secs(3600),
        };
        let _busy = SottoError::ConcurrencyExhausted {
            retry_after: std::time::Duration::from_secs(30),
        };
        let _conflict = SottoError::AgentTakeoverConflict {
            conversation_id: "c1".into(),
        };
        let _closed = SottoError::ConversationClosed {
            conversation_id: "c1".into(),
        };
        let _upstream = SottoError::UpstreamGateway {
            status: 500,
            source: None,
        };
        let _store = SottoError::store("rpc failed", std::io::Error::other("io"));
        let _not_found = SottoError::NotFound {
            what: "conversation".into(),
        };
    }

    #[test]
    fn retryable_covers_backpressure_errors() {
        assert!(
            SottoError::RateLimitExceeded {
                scope: LimitScope::Conversation,
                retry_after: std::time::Duration::from_secs(3600),
            }
            .is_retryable()
        );
        assert!(
            SottoError::ConcurrencyExhausted {
                retry_after: std::time::Duration::from_secs(30),
            }
            .is_retryable()
        );
        assert!(SottoError::UpstreamRateLimited.is_retryable());
        assert!(!SottoError::UpstreamBilling.is_retryable());
        assert!(!SottoError::Unauthorized.is_retryable());
    }

    #[test]
    fn adapter_traits_are_object_safe() {
        fn _store(_: &dyn ConversationStore) {}
        fn _gateway(_: &dyn CompletionGateway) {}
    }
}
