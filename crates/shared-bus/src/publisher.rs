//! # Event Publisher
//!
//! The publishing side of the single-owning-strand event bus (§4.1, §5).

use crate::events::{ChainEvent, EventFilter, EventKind};
use crate::subscriber::{EventStream, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Publishing side of the bus. A chaser calls `publish` from its own
/// strand; handlers observe events in publication order (§5: "Ordering").
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes an event, returning the number of subscribers it reached.
    async fn publish(&self, event: ChainEvent) -> usize;

    /// Publishes an event targeted at a single channel key, equivalent to
    /// the design's `notify_one(key, …)` (§4.1).
    async fn notify_one(&self, event: ChainEvent) -> usize;

    /// Total events published since construction.
    fn events_published(&self) -> u64;
}

/// Single-process event bus backed by a broadcast channel. Every chaser
/// and the bus itself run on one owning strand (§5); this type does not
/// itself provide that guarantee — callers publish only from their
/// strand task.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<ChainEvent>,
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    events_published: AtomicU64,
    capacity: usize,
    /// The most recently published `stop` (§4.1, P7): latched so a
    /// subscriber created after shutdown still gets exactly one `stop`,
    /// since a fresh `broadcast::Receiver` only sees events sent after it
    /// subscribes. Replayed to matching subscriptions at construction via
    /// the same keyed-delivery path `notify_one` uses, rather than
    /// re-broadcasting it (which would hand every other live subscriber a
    /// second copy).
    last_stop: Arc<RwLock<Option<ChainEvent>>>,
}

impl InMemoryEventBus {
    /// Creates a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Creates a bus with a specific channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
            last_stop: Arc::new(RwLock::new(None)),
        }
    }

    /// Subscribes to events matching `filter`.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let topic_key = format!("{:?}/{:?}", filter.topics, filter.key);

        {
            let mut subs = self.subscriptions.write();
            *subs.entry(topic_key.clone()).or_insert(0) += 1;
        }

        let replay = self
            .last_stop
            .read()
            .as_ref()
            .filter(|event| filter.matches(event))
            .copied();

        debug!(topics = ?filter.topics, key = ?filter.key, replayed_stop = replay.is_some(), "new subscription");
        Subscription::new(receiver, filter, self.subscriptions.clone(), topic_key, replay)
    }

    /// Returns a `Stream` wrapper over a subscription.
    #[must_use]
    pub fn event_stream(&self, filter: EventFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Number of live subscriptions (including channel-keyed ones).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Configured channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: ChainEvent) -> usize {
        let kind = event.kind;
        let component = event.component;

        self.events_published.fetch_add(1, Ordering::Relaxed);

        if kind == EventKind::Stop {
            *self.last_stop.write() = Some(event);
        }

        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(?kind, ?component, receivers = receiver_count, "event published");
                receiver_count
            }
            Err(err) => {
                warn!(?kind, ?component, error = %err, "event dropped, no receivers");
                0
            }
        }
    }

    async fn notify_one(&self, event: ChainEvent) -> usize {
        // The broadcast transport has no single-receiver send; every
        // subscription filters on `event.key`, so only the matching
        // channel's `Subscription::recv` actually returns this event.
        self.publish(event).await
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Component, EventKind, EventTopic, EventValue};
    use shared_types::errors::Code;

    fn sample(kind: EventKind) -> ChainEvent {
        ChainEvent::new(Component::Organize, kind, EventValue::Empty, Code::Success)
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_returns_zero() {
        let bus = InMemoryEventBus::new();
        let receivers = bus.publish(sample(EventKind::Start)).await;
        assert_eq!(receivers, 0);
        assert_eq!(bus.events_published(), 1);
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let bus = InMemoryEventBus::new();
        let _s1 = bus.subscribe(EventFilter::all());
        let _s2 = bus.subscribe(EventFilter::all());
        let receivers = bus.publish(sample(EventKind::Bump)).await;
        assert_eq!(receivers, 2);
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn custom_capacity_is_reported() {
        let bus = InMemoryEventBus::with_capacity(64);
        assert_eq!(bus.capacity(), 64);
    }

    #[tokio::test]
    async fn topic_filtered_subscriber_is_still_counted() {
        let bus = InMemoryEventBus::new();
        let _s = bus.subscribe(EventFilter::topics(vec![EventTopic::Component(
            Component::Confirm,
        )]));
        let receivers = bus.publish(sample(EventKind::Stop)).await;
        assert_eq!(receivers, 1);
    }

    // P7: "subscribing after `stop` delivers exactly one `stop` event to
    // the late subscriber (via keyed unsubscribe semantics)."
    #[tokio::test]
    async fn late_subscriber_receives_exactly_one_stop() {
        let bus = InMemoryEventBus::new();
        bus.publish(sample(EventKind::Stop)).await;

        let mut late = bus.subscribe(EventFilter::all());
        let received = late.recv().await.expect("latched stop replayed");
        assert_eq!(received.kind, EventKind::Stop);

        assert!(
            matches!(late.try_recv(), Ok(None)),
            "the stop must be delivered exactly once, not replayed again"
        );
    }

    #[tokio::test]
    async fn late_subscriber_with_non_matching_filter_gets_no_replay() {
        let bus = InMemoryEventBus::new();
        bus.publish(sample(EventKind::Stop)).await;

        let mut late = bus.subscribe(EventFilter::topics(vec![EventTopic::Component(
            Component::Confirm,
        )]));
        assert!(matches!(late.try_recv(), Ok(None)));
    }
}
