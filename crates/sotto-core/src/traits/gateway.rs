// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion gateway trait for the upstream streaming text-completion service.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::SottoError;
use crate::traits::adapter::ServiceAdapter;
use crate::types::{ChatMessage, StreamChunk};

/// A boxed stream of completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, SottoError>> + Send>>;

/// Adapter for the upstream language-model gateway.
///
/// The gateway is an opaque streaming text-completion service; the relay
/// never interprets chunks beyond extracting the text delta.
#[async_trait]
pub trait CompletionGateway: ServiceAdapter {
    /// Opens a streaming completion for the given transcript.
    ///
    /// Fails before any chunk is produced when the gateway rejects the
    /// request (rate limit, billing, transport). Mid-stream failures surface
    /// as `Err` items on the stream.
    async fn stream_completion(&self, messages: Vec<ChatMessage>)
    -> Result<ChunkStream, SottoError>;
}
