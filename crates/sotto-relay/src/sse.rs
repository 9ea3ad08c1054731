// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events plumbing: the re-encrypting completion relay and the
//! bus-backed event streams.
//!
//! The completion relay consumes upstream chunks and emits one `data:` line
//! per chunk, sealed per-chunk in encrypted mode, terminated by a literal
//! unencrypted `data: [DONE]` sentinel. The transform never buffers the full
//! response; the caller renders partial output as each frame decrypts.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use axum::response::sse::{Event, Sse};
use futures::stream::{Stream, StreamExt};
use sotto_bus::{BusEvent, EventBus, Subscription, Topic};
use sotto_core::{ChunkStream, ConversationStore, SenderType, StoredMessage};
use sotto_crypto::{DerivedKey, seal_chunk};
use sotto_limiter::StreamSlot;
use sotto_metrics::RequestOutcome;
use sotto_session::identity::id_prefix;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// The unencrypted terminal sentinel.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Everything the relay task needs beyond the upstream stream itself.
pub struct StreamContext {
    pub store: Arc<dyn ConversationStore>,
    pub bus: EventBus,
    /// Persist the assembled reply here when known.
    pub conversation_id: Option<String>,
    /// Concurrency admission; released when the relay task finishes.
    pub slot: StreamSlot,
    /// `Some` in encrypted mode.
    pub key: Option<DerivedKey>,
    /// Request arrival time, for the latency histogram.
    pub started: Instant,
}

/// Relay an upstream completion stream to the caller.
///
/// The driver task owns the gauge slot and the upstream stream, so a caller
/// disconnect stops delivery but lets the in-flight completion finish,
/// persist, and release its slot. On upstream error mid-stream the
/// downstream ends cleanly after the emitted chunks instead of hanging.
pub fn relay_completion(
    upstream: ChunkStream,
    ctx: StreamContext,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    let (tx, rx) = mpsc::channel::<String>(32);
    tokio::spawn(drive_relay(upstream, ctx, tx));

    Sse::new(futures::stream::unfold(rx, |mut rx| async move {
        let payload = rx.recv().await?;
        Some((Ok(Event::default().data(payload)), rx))
    }))
}

async fn drive_relay(mut upstream: ChunkStream, ctx: StreamContext, tx: mpsc::Sender<String>) {
    let mut assembled = String::new();
    let mut delivering = true;
    let mut failed = false;

    while let Some(item) = upstream.next().await {
        match item {
            Ok(chunk) => {
                if let Some(delta) = &chunk.delta {
                    assembled.push_str(delta);
                }
                if !delivering {
                    continue;
                }

                // Reconstruct the upstream frame so the caller decrypts the
                // exact `data: {json}` line it would have seen unencrypted.
                let payload = match &ctx.key {
                    Some(key) => {
                        let frame = format!("data: {}\n\n", chunk.raw);
                        match seal_chunk(&frame, key) {
                            Ok(token) => token,
                            Err(e) => {
                                warn!(error = %e, "failed to seal chunk, skipping");
                                continue;
                            }
                        }
                    }
                    None => chunk.raw.clone(),
                };

                sotto_metrics::record_chunk();
                if tx.send(payload).await.is_err() {
                    // Caller went away; keep draining so the reply persists.
                    debug!("caller disconnected mid-stream");
                    delivering = false;
                }
            }
            Err(e) => {
                warn!(error = %e, "upstream stream failed mid-relay");
                failed = true;
                break;
            }
        }
    }

    if delivering && !failed {
        let _ = tx.send(DONE_SENTINEL.to_string()).await;
    }

    persist_reply(&ctx, &assembled).await;

    sotto_metrics::record_request(if failed {
        RequestOutcome::Error
    } else {
        RequestOutcome::Streamed
    });
    sotto_metrics::record_latency(ctx.started.elapsed().as_secs_f64());
}

/// Persist the assembled assistant text and announce it on the bus.
async fn persist_reply(ctx: &StreamContext, assembled: &str) {
    let Some(conversation_id) = &ctx.conversation_id else {
        return;
    };
    if assembled.is_empty() {
        return;
    }

    match ctx
        .store
        .append_message(conversation_id, SenderType::Ai, None, assembled)
        .await
    {
        Ok(message_id) => {
            debug!(
                conversation = %id_prefix(conversation_id),
                chars = assembled.len(),
                "persisted assistant reply"
            );
            ctx.bus.publish(
                &Topic::conversation(conversation_id.clone()),
                BusEvent::MessageAppended {
                    conversation_id: conversation_id.clone(),
                    message: StoredMessage {
                        id: message_id,
                        conversation_id: conversation_id.clone(),
                        sender_type: SenderType::Ai,
                        sender_id: None,
                        message: assembled.to_string(),
                        created_at: chrono::Utc::now().to_rfc3339(),
                    },
                },
            );
        }
        Err(e) => {
            warn!(
                conversation = %id_prefix(conversation_id),
                error = %e,
                "failed to persist assistant reply"
            );
        }
    }
}

/// Turn a bus subscription into an SSE stream of JSON `data:` frames.
///
/// Ends when the topic is pruned (last publisher-side interest gone).
pub fn bus_events(
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    Sse::new(futures::stream::unfold(
        subscription,
        |mut subscription| async move {
            let event = subscription.recv().await?;
            let json = serde_json::to_string(&event).ok()?;
            Some((Ok(Event::default().data(json)), subscription))
        },
    ))
}
