// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion gateway with scripted, word-split streaming replies.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use sotto_core::{
    ChatMessage, ChunkStream, CompletionGateway, HealthStatus, ServiceAdapter, SottoError,
    StreamChunk,
};
use tokio::sync::{Mutex, oneshot};

/// The reply used when the script queue is empty.
pub const DEFAULT_REPLY: &str = "Happy to help!";

enum Script {
    /// Stream the text immediately, one chunk per word.
    Reply(String),
    /// Refuse the request before any chunk.
    Fail(SottoError),
    /// Hold the stream open until the release signal fires, then stream.
    Held {
        release: oneshot::Receiver<()>,
        text: String,
    },
}

/// A mock gateway that pops scripted outcomes from a FIFO queue.
///
/// When the queue is empty, [`DEFAULT_REPLY`] is streamed.
pub struct MockGateway {
    scripts: Arc<Mutex<VecDeque<Script>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Queue a reply to stream, split into one chunk per word.
    pub async fn push_reply(&self, text: impl Into<String>) {
        self.scripts
            .lock()
            .await
            .push_back(Script::Reply(text.into()));
    }

    /// Queue a pre-stream failure.
    pub async fn push_error(&self, error: SottoError) {
        self.scripts.lock().await.push_back(Script::Fail(error));
    }

    /// Queue a reply that stays open until the returned sender fires.
    ///
    /// For concurrency-cap tests: the stream (and its admission slot) stays
    /// alive until released.
    pub async fn push_held_reply(&self, text: impl Into<String>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.scripts.lock().await.push_back(Script::Held {
            release: rx,
            text: text.into(),
        });
        tx
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// One delta chunk framed the way the real gateway frames it.
fn word_chunks(text: &str) -> Vec<Result<StreamChunk, SottoError>> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let delta = if i == last {
                (*word).to_string()
            } else {
                format!("{word} ")
            };
            let raw = serde_json::json!({
                "choices": [{"delta": {"content": delta}}]
            })
            .to_string();
            Ok(StreamChunk {
                raw,
                delta: Some(delta),
            })
        })
        .collect()
}

#[async_trait]
impl ServiceAdapter for MockGateway {
    fn name(&self) -> &str {
        "mock-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SottoError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CompletionGateway for MockGateway {
    async fn stream_completion(
        &self,
        _messages: Vec<ChatMessage>,
    ) -> Result<ChunkStream, SottoError> {
        let script = self
            .scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::Reply(DEFAULT_REPLY.to_string()));

        match script {
            Script::Fail(error) => Err(error),
            Script::Reply(text) => Ok(Box::pin(stream::iter(word_chunks(&text)))),
            Script::Held { release, text } => {
                let chunks = word_chunks(&text).into_iter();
                Ok(Box::pin(stream::unfold(
                    (Some(release), chunks),
                    |(release, mut chunks)| async move {
                        if let Some(rx) = release {
                            let _ = rx.await;
                        }
                        chunks.next().map(|item| (item, (None, chunks)))
                    },
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    async fn assemble(mut stream: ChunkStream) -> String {
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            if let Some(delta) = chunk.unwrap().delta {
                out.push_str(&delta);
            }
        }
        out
    }

    #[tokio::test]
    async fn scripted_replies_stream_in_order() {
        let gateway = MockGateway::new();
        gateway.push_reply("first reply").await;
        gateway.push_reply("second").await;

        let a = gateway.stream_completion(vec![]).await.unwrap();
        assert_eq!(assemble(a).await, "first reply");
        let b = gateway.stream_completion(vec![]).await.unwrap();
        assert_eq!(assemble(b).await, "second");
        // Queue exhausted, falls back to the default.
        let c = gateway.stream_completion(vec![]).await.unwrap();
        assert_eq!(assemble(c).await, DEFAULT_REPLY);
    }

    #[tokio::test]
    async fn raw_frames_carry_the_delta_shape() {
        let gateway = MockGateway::new();
        gateway.push_reply("hi there").await;

        let mut stream = gateway.stream_completion(vec![]).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&first.raw).unwrap();
        assert_eq!(parsed["choices"][0]["delta"]["content"], "hi ");
    }

    #[tokio::test]
    async fn scripted_error_fails_before_streaming() {
        let gateway = MockGateway::new();
        gateway.push_error(SottoError::UpstreamRateLimited).await;

        let result = gateway.stream_completion(vec![]).await;
        assert!(matches!(result, Err(SottoError::UpstreamRateLimited)));
    }

    #[tokio::test]
    async fn held_reply_waits_for_the_release() {
        let gateway = MockGateway::new();
        let release = gateway.push_held_reply("held").await;

        let mut stream = gateway.stream_completion(vec![]).await.unwrap();

        // Nothing arrives until release fires.
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err());

        release.send(()).unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.delta.as_deref(), Some("held"));
    }
}
