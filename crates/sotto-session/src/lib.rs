// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation ownership for the Sotto relay.
//!
//! Three concerns live here:
//!
//! - [`identity`]: minting and resolving anonymous visitor sessions.
//! - [`state`]: the serving-state machine deciding whether the AI or a
//!   human agent answers, derived from the stored conversation row.
//! - [`classifier`]: the pluggable detector for "I want a human" messages.

pub mod classifier;
pub mod identity;
pub mod state;

pub use classifier::{HandoffClassifier, HandoffVerdict, KeywordClassifier};
pub use identity::{VisitorIdentity, mint_session_token, mint_visitor_id};
pub use state::ServingState;
