// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Sotto's external collaborators.
//!
//! All adapters extend the [`ServiceAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod gateway;
pub mod store;

// Re-export all traits at the traits module level for convenience.
pub use adapter::ServiceAdapter;
pub use gateway::{ChunkStream, CompletionGateway};
pub use store::ConversationStore;
