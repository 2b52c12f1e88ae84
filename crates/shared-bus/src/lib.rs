//! # Shared Bus — Chain Event Bus
//!
//! The single-owning-strand publish/subscribe bus every chaser uses to
//! announce chain-state transitions (§4.1). Chasers never call one
//! another directly; all cross-component signaling goes through here.
//!
//! ```text
//! ┌───────────┐   publish()   ┌───────────┐   subscribe()   ┌───────────┐
//! │ organize  │ ─────────────▶│   bus     │◀───────────────│  check    │
//! └───────────┘               └───────────┘                 └───────────┘
//! ```
//!
//! Channel-scoped events (`purge`, `starved`, `stall`, `split`) carry a
//! routing key so a single peer channel's subscription can pick them out
//! of the broadcast stream (`notify_one`, §4.1).

// Nursery lints that are too strict for this crate's event-tag pattern.
#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;
pub mod suspend;

pub use events::{ChainEvent, Component, EventFilter, EventKind, EventTopic, EventValue};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};
pub use suspend::SuspendState;

/// Current protocol version for bus messages.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default broadcast channel capacity before a slow subscriber starts
/// lagging (§4.1 backpressure is handled at the chaser level, not here).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
