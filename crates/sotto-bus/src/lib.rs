// SPDX-FileCopyrightText: 2026 Sotto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local typed-topic pub/sub for conversation and typing events.
//!
//! The bus is a registry of bounded broadcast channels keyed by [`Topic`].
//! Publishing is fire-and-forget; subscribing returns a [`Subscription`]
//! guard whose drop prunes the topic once the last subscriber is gone.
//! Lagged subscribers skip missed events rather than blocking publishers.
//!
//! Scope: one process. Cross-instance delivery is the external store's
//! change feed, which is out of scope here.

pub mod event;
pub mod topic;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::trace;

pub use event::BusEvent;
pub use topic::Topic;

/// Default per-topic channel capacity.
pub const DEFAULT_CAPACITY: usize = 64;

/// The process-local event bus.
///
/// Cheap to clone; all clones share one topic registry.
#[derive(Clone)]
pub struct EventBus {
    topics: Arc<DashMap<Topic, broadcast::Sender<BusEvent>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Publish an event on a topic. Fire-and-forget: events published while
    /// a topic has no subscribers are dropped.
    pub fn publish(&self, topic: &Topic, event: BusEvent) {
        if let Some(sender) = self.topics.get(topic) {
            let delivered = sender.send(event).unwrap_or(0);
            trace!(topic = %topic, delivered, "bus publish");
        } else {
            trace!(topic = %topic, "bus publish with no subscribers");
        }
    }

    /// Subscribe to a topic, creating it on first use.
    ///
    /// The returned guard unsubscribes on drop; the topic is pruned from the
    /// registry once its last subscriber is gone.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let receiver = self
            .topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Subscription {
            topic,
            receiver,
            bus: self.clone(),
        }
    }

    /// Number of topics with at least one live subscriber.
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    fn prune_if_empty(&self, topic: &Topic) {
        // remove_if re-checks under the shard lock, so a racing subscribe
        // either lands before the removal or recreates the topic after it.
        self.topics
            .remove_if(topic, |_, sender| sender.receiver_count() == 0);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.topics.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// A live subscription to one topic.
///
/// Dropping the guard unsubscribes and prunes the topic if it was the last
/// subscriber.
pub struct Subscription {
    topic: Topic,
    receiver: broadcast::Receiver<BusEvent>,
    bus: EventBus,
}

impl Subscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Receive the next event.
    ///
    /// Returns `None` when the topic is gone. A lagged subscriber skips the
    /// missed events and resumes from the oldest retained one.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    trace!(topic = %self.topic, skipped, "bus subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Swap in a detached receiver so the real one is dropped before the
        // prune checks receiver_count.
        drop(std::mem::replace(
            &mut self.receiver,
            broadcast::channel(1).1,
        ));
        self.bus.prune_if_empty(&self.topic);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic.to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use sotto_core::{ConversationStatus, TypingDirection, TypingEvent};

    use super::*;

    fn status_event(id: &str) -> BusEvent {
        BusEvent::StatusChanged {
            conversation_id: id.into(),
            status: ConversationStatus::Active,
            assigned_admin_id: None,
        }
    }

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(Topic::conversation("c1"));

        bus.publish(&Topic::conversation("c1"), status_event("c1"));

        let event = sub.recv().await.unwrap();
        assert!(matches!(event, BusEvent::StatusChanged { .. }));
    }

    #[tokio::test]
    async fn events_before_subscribe_are_not_delivered() {
        let bus = EventBus::new();
        bus.publish(&Topic::conversation("c1"), status_event("c1"));

        let mut sub = bus.subscribe(Topic::conversation("c1"));
        bus.publish(&Topic::conversation("c1"), status_event("c1"));

        // Only the post-subscribe event arrives.
        let _first = sub.recv().await.unwrap();
        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            sub.recv(),
        )
        .await;
        assert!(pending.is_err(), "no second event should be queued");
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = EventBus::new();
        let mut c1 = bus.subscribe(Topic::conversation("c1"));
        let mut c2 = bus.subscribe(Topic::conversation("c2"));

        bus.publish(&Topic::conversation("c2"), status_event("c2"));

        let event = c2.recv().await.unwrap();
        match event {
            BusEvent::StatusChanged {
                conversation_id, ..
            } => assert_eq!(conversation_id, "c2"),
            other => panic!("unexpected event {other:?}"),
        }

        let nothing =
            tokio::time::timeout(std::time::Duration::from_millis(20), c1.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn last_subscriber_drop_prunes_topic() {
        let bus = EventBus::new();
        let a = bus.subscribe(Topic::typing(TypingDirection::User, "c1"));
        let b = bus.subscribe(Topic::typing(TypingDirection::User, "c1"));
        assert_eq!(bus.topic_count(), 1);

        drop(a);
        assert_eq!(bus.topic_count(), 1, "one subscriber still live");

        drop(b);
        assert_eq!(bus.topic_count(), 0, "empty topic should be pruned");
    }

    #[tokio::test]
    async fn lagged_subscriber_skips_instead_of_blocking() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe(Topic::conversation("c1"));

        // Overflow the bounded channel.
        for _ in 0..10 {
            bus.publish(&Topic::conversation("c1"), status_event("c1"));
        }

        // recv skips the lag and still yields the retained events.
        let event = sub.recv().await;
        assert!(event.is_some());
    }

    #[tokio::test]
    async fn typing_events_flow_through_typing_topics() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(Topic::typing(TypingDirection::Admin, "c9"));

        bus.publish(
            &Topic::typing(TypingDirection::Admin, "c9"),
            BusEvent::Typing(TypingEvent::now(TypingDirection::Admin)),
        );

        match sub.recv().await.unwrap() {
            BusEvent::Typing(ev) => assert_eq!(ev.sender, TypingDirection::Admin),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
