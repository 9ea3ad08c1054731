// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anonymous visitor identity.
//!
//! A visitor holds exactly one credential: the session token minted when
//! their conversation row is created. The token is 32 random bytes (256
//! bits of entropy, URL-safe base64 without padding); the visitor id is a
//! non-credential label for the owner row.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::{SecureRandom, SystemRandom};
use sotto_core::{Conversation, ConversationStatus, ConversationStore, SottoError, VisitorSession};
use tracing::info;

const TOKEN_BYTES: usize = 32;
const VISITOR_SUFFIX_LEN: usize = 8;

/// Mint an unguessable session token.
///
/// Used by store implementations that mint in-process; the production
/// store mints server-side with the same format.
pub fn mint_session_token() -> Result<String, SottoError> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes)
        .map_err(|_| SottoError::Internal("failed to generate session token".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Mint a visitor id: `visitor_{unix_millis}_{8 random alphanumerics}`.
///
/// A label, not a credential; it appears in store rows and logs.
pub fn mint_visitor_id() -> Result<String, SottoError> {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let rng = SystemRandom::new();
    let mut bytes = [0u8; VISITOR_SUFFIX_LEN];
    rng.fill(&mut bytes)
        .map_err(|_| SottoError::Internal("failed to generate visitor id".to_string()))?;
    let suffix: String = bytes
        .iter()
        .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
        .collect();
    Ok(format!(
        "visitor_{}_{}",
        chrono::Utc::now().timestamp_millis(),
        suffix
    ))
}

/// Session lifecycle over the external store.
pub struct VisitorIdentity<'a> {
    store: &'a dyn ConversationStore,
}

impl<'a> VisitorIdentity<'a> {
    pub fn new(store: &'a dyn ConversationStore) -> Self {
        Self { store }
    }

    /// Mint a fresh visitor and allocate their conversation.
    ///
    /// The returned token is the caller's only credential; it is handed out
    /// exactly once and stored only in the caller's ephemeral storage.
    pub async fn create_session(&self) -> Result<VisitorSession, SottoError> {
        let visitor_id = mint_visitor_id()?;
        let session = self.store.create_visitor_conversation(&visitor_id).await?;
        info!(
            conversation = %id_prefix(&session.conversation_id),
            "visitor session created"
        );
        Ok(session)
    }

    /// Resolve a token to its single conversation.
    ///
    /// Closed conversations do not resolve: the caller must mint a new
    /// session, there is no way to resume with an old token.
    pub async fn resolve(&self, session_token: &str) -> Result<Conversation, SottoError> {
        let conversation = self.store.get_visitor_conversation(session_token).await?;
        if conversation.status == ConversationStatus::Closed {
            return Err(SottoError::ConversationClosed {
                conversation_id: conversation.id,
            });
        }
        Ok(conversation)
    }
}

/// First 8 characters of a conversation id, for logging. Session tokens are
/// never logged at all.
pub fn id_prefix(id: &str) -> &str {
    &id[..id.len().min(8)]
}
