//! # Event Subscriber
//!
//! The subscription side of the bus: a filtered handle over the
//! broadcast channel, plus a `Stream` adapter for use with combinators.

use crate::events::{ChainEvent, EventFilter};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The bus was dropped; no further events will arrive.
    #[error("event bus closed")]
    Closed,
}

/// Trait for obtaining a filtered subscription from the bus.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscribes to events matching `filter`.
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

/// A subscription handle. Dropping it releases the underlying receiver
/// and decrements the bus's subscription accounting.
///
/// §4.1: "handlers return false to unsubscribe" — callers model that by
/// ending their `recv` loop and dropping the `Subscription`.
pub struct Subscription {
    receiver: broadcast::Receiver<ChainEvent>,
    filter: EventFilter,
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,
    topic_key: String,
    /// A latched terminal event (P7: `stop` published before this
    /// subscription existed) replayed exactly once before falling through
    /// to the live broadcast receiver.
    replay: Option<ChainEvent>,
}

impl Subscription {
    pub(crate) fn new(
        receiver: broadcast::Receiver<ChainEvent>,
        filter: EventFilter,
        subscriptions: Arc<RwLock<HashMap<String, usize>>>,
        topic_key: String,
        replay: Option<ChainEvent>,
    ) -> Self {
        Self {
            receiver,
            filter,
            subscriptions,
            topic_key,
            replay,
        }
    }

    /// Awaits the next event that matches this subscription's filter.
    /// Returns `None` once the bus is dropped.
    pub async fn recv(&mut self) -> Option<ChainEvent> {
        if let Some(event) = self.replay.take() {
            return Some(event);
        }
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "subscriber lagged, events dropped");
                    continue;
                }
            };
            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Non-blocking receive: `Ok(None)` means nothing is ready yet.
    pub fn try_recv(&mut self) -> Result<Option<ChainEvent>, SubscriptionError> {
        if let Some(event) = self.replay.take() {
            return Ok(Some(event));
        }
        loop {
            let event = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(SubscriptionError::Closed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };
            if self.filter.matches(&event) {
                return Ok(Some(event));
            }
        }
    }

    /// Returns this subscription's filter.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subs = self.subscriptions.write();
        let Some(count) = subs.get_mut(&self.topic_key) else {
            return;
        };
        *count = count.saturating_sub(1);
        if *count == 0 {
            subs.remove(&self.topic_key);
        }
    }
}

/// Adapts a [`Subscription`] to `tokio_stream::Stream`.
pub struct EventStream {
    subscription: Subscription,
}

impl EventStream {
    /// Wraps a subscription as a stream.
    #[must_use]
    pub fn new(subscription: Subscription) -> Self {
        Self { subscription }
    }

    /// Returns the wrapped subscription's filter.
    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        self.subscription.filter()
    }
}

impl Stream for EventStream {
    type Item = ChainEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.subscription.try_recv() {
            Ok(Some(event)) => Poll::Ready(Some(event)),
            Ok(None) => {
                cx.waker().wake_by_ref();
                Poll::Pending
            }
            Err(SubscriptionError::Closed) => Poll::Ready(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Component, EventKind, EventTopic, EventValue};
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::errors::Code;
    use std::time::Duration;
    use tokio::time::timeout;

    fn sample(kind: EventKind) -> ChainEvent {
        ChainEvent::new(Component::Organize, kind, EventValue::Empty, Code::Success)
    }

    #[tokio::test]
    async fn subscription_receives_published_event() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        bus.publish(sample(EventKind::Bump)).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("no timeout")
            .expect("event present");
        assert!(matches!(received.kind, EventKind::Bump));
    }

    #[tokio::test]
    async fn topic_filter_drops_other_components() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Component(
            Component::Confirm,
        )]));

        bus.publish(ChainEvent::new(
            Component::Check,
            EventKind::Download,
            EventValue::Size(2),
            Code::Success,
        ))
        .await;
        bus.publish(ChainEvent::new(
            Component::Confirm,
            EventKind::Organized,
            EventValue::U64(3),
            Code::Success,
        ))
        .await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("no timeout")
            .expect("event present");
        assert!(matches!(received.kind, EventKind::Organized));
    }

    #[tokio::test]
    async fn dropping_subscription_decrements_count() {
        let bus = InMemoryEventBus::new();
        {
            let _s1 = bus.subscribe(EventFilter::all());
            let _s2 = bus.subscribe(EventFilter::all());
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn try_recv_reports_empty_without_blocking() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        assert!(matches!(sub.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn keyed_subscription_ignores_other_channels() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::for_key(1));

        bus.notify_one(ChainEvent::keyed(
            Component::Check,
            EventKind::Starved,
            EventValue::Empty,
            Code::Success,
            2,
        ))
        .await;
        bus.notify_one(ChainEvent::keyed(
            Component::Check,
            EventKind::Starved,
            EventValue::Empty,
            Code::Success,
            1,
        ))
        .await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("no timeout")
            .expect("event present");
        assert_eq!(received.key, Some(1));
    }
}
