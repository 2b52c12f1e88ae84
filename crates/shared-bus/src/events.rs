//! # Chain Events
//!
//! The typed event flowing through the single-strand bus (§4.1). Every
//! event is a `(kind, value)` pair plus an error code; some kinds additionally
//! carry a routing key so a single channel can be targeted with
//! `notify_one` instead of broadcasting to every subscriber.

use serde::{Deserialize, Serialize};
use shared_types::errors::Code;

/// The component that owns publishing a given event kind, matching the
/// core's eight cooperating pieces (§2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    /// C1: the event bus itself.
    Bus,
    /// C2: the store facade.
    Store,
    /// C3: the organize chaser.
    Organize,
    /// C4: the check chaser.
    Check,
    /// C5: the validate chaser.
    Validate,
    /// C6: the confirm chaser.
    Confirm,
    /// C7: the snapshot chaser.
    Snapshot,
    /// C8: per-peer channel protocols.
    Protocols,
}

/// The kind half of an event's `(kind, value)` pair (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A chaser or channel has started.
    Start,
    /// The candidate chain top advanced; value carries the new height.
    Bump,
    /// Header count changed at the header-in channel.
    Headers,
    /// The check chaser assigned download work; value carries the count.
    Download,
    /// A channel confirmed a downloaded block matches its header.
    Checked,
    /// A channel's delivered block failed the header/body consistency
    /// check (not a consensus failure).
    Unchecked,
    /// The validate chaser accepted a candidate's consensus validity.
    Valid,
    /// The validate chaser rejected a candidate's consensus validity.
    Unvalid,
    /// A candidate became promotable onto the confirmed chain.
    Confirmable,
    /// A candidate was marked `block_unconfirmable`.
    Unconfirmable,
    /// The confirm chaser promoted a branch onto the confirmed chain.
    Organized,
    /// The organize chaser replaced the top of the candidate chain.
    Reorganized,
    /// The candidate chain top regressed to a lower branch point.
    Regressed,
    /// A branch above the fork point was rolled back into the cache.
    Disorganized,
    /// A confirmed block is ready for peer announcement.
    Block,
    /// A channel's download map was cleared and the channel stopped.
    Purge,
    /// A stalled channel's download map was split between two channels.
    Split,
    /// A channel's download throughput fell below the fairness threshold.
    Stall,
    /// A channel requested work and found the queue empty.
    Starved,
    /// The snapshot chaser should take a store snapshot.
    Snap,
    /// Peer channels should resume after a suspend.
    Resume,
    /// Peer channels must suspend (e.g. store wait-lock, fault).
    Suspend,
    /// Store free space fell below the configured minimum.
    Space,
    /// Periodic telemetry report.
    Report,
    /// The node core is shutting down.
    Stop,
}

/// The value half of an event's `(kind, value)` pair (§4.1): a tagged
/// union over the three payload shapes the design calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventValue {
    /// No payload.
    Empty,
    /// A 32-bit value (most height/count signals).
    U32(u32),
    /// A 64-bit value (byte counts, cumulative totals).
    U64(u64),
    /// A size value (queue/backlog lengths).
    Size(usize),
}

impl EventValue {
    /// Returns the value as `u64` where that's meaningful, for callers
    /// that don't care which integer width produced it.
    #[must_use]
    pub fn as_u64(self) -> Option<u64> {
        match self {
            EventValue::Empty => None,
            EventValue::U32(v) => Some(u64::from(v)),
            EventValue::U64(v) => Some(v),
            EventValue::Size(v) => Some(v as u64),
        }
    }
}

/// One event on the bus: a kind, a value, an error code, and — for
/// channel-scoped kinds — a routing key used for keyed `notify_one`
/// delivery instead of a broadcast (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEvent {
    /// Which component published this event.
    pub component: Component,
    /// The event kind.
    pub kind: EventKind,
    /// The event's payload.
    pub value: EventValue,
    /// The outcome code carried by every event, success on the happy path.
    pub code: Code,
    /// Present for channel-targeted kinds (`purge`, `split`, `starved`,
    /// `stall`, `checked`, `unchecked`): the channel's identity.
    pub key: Option<u64>,
}

impl ChainEvent {
    /// Builds a broadcast event with no routing key.
    #[must_use]
    pub fn new(component: Component, kind: EventKind, value: EventValue, code: Code) -> Self {
        Self {
            component,
            kind,
            value,
            code,
            key: None,
        }
    }

    /// Builds an event targeted at a single channel via `notify_one`.
    #[must_use]
    pub fn keyed(
        component: Component,
        kind: EventKind,
        value: EventValue,
        code: Code,
        key: u64,
    ) -> Self {
        Self {
            component,
            kind,
            value,
            code,
            key: Some(key),
        }
    }

    /// Returns the topic this event is delivered under.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        EventTopic::Component(self.component)
    }
}

/// Topics for subscription filtering (§4.1: "single owning strand";
/// subscribers choose a component or `All`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Events from one component.
    Component(Component),
    /// Every event, unfiltered.
    All,
}

/// A subscription filter: component topics plus an optional channel key
/// restriction for targeted delivery.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// If set, only events with no key or a matching key are delivered.
    pub key: Option<u64>,
}

impl EventFilter {
    /// Accepts every event regardless of topic or key.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accepts events from the given components only.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics, key: None }
    }

    /// Restricts delivery to broadcast events plus events keyed to `key`
    /// (a channel's own `notify_one` subscription).
    #[must_use]
    pub fn for_key(key: u64) -> Self {
        Self {
            topics: Vec::new(),
            key: Some(key),
        }
    }

    /// Returns true if `event` passes this filter.
    #[must_use]
    pub fn matches(&self, event: &ChainEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let key_match = match (self.key, event.key) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(want), Some(have)) => want == have,
        };

        topic_match && key_match
    }
}
