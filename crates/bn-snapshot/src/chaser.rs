//! The snapshot chaser (C7): one-shot prevout-cache pruning plus
//! policy-triggered cold/hot store snapshots (§4.7, §4.7.1).

use crate::domain::SnapshotSettings;
use bn_store::{StoreEvent, StoreTable};
use shared_bus::{ChainEvent, Component, EventKind, EventPublisher, EventValue, SuspendState};
use shared_types::errors::Code;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Owns the prune/snapshot decision procedure on its single strand (§5.1).
pub struct SnapshotChaser<S> {
    store: Arc<S>,
    bus: Arc<dyn EventPublisher>,
    suspended: SuspendState,
    #[allow(dead_code)]
    settings: SnapshotSettings,
    pruned: AtomicBool,
}

impl<S> SnapshotChaser<S>
where
    S: bn_store::ChainStore,
{
    /// Builds a chaser; `suspended` is the flag shared with every other
    /// source of node-wide suspension (§4.7.1).
    pub fn new(
        store: Arc<S>,
        bus: Arc<dyn EventPublisher>,
        suspended: SuspendState,
        settings: SnapshotSettings,
    ) -> Self {
        Self {
            store,
            bus,
            suspended,
            settings,
            pruned: AtomicBool::new(false),
        }
    }

    /// True once the one-shot prune has completed successfully.
    #[must_use]
    pub fn is_pruned(&self) -> bool {
        self.pruned.load(Ordering::SeqCst)
    }

    /// `block`: attempts the one-shot prevout-cache prune once the chain
    /// is coalesced (§4.7.1). A failure while the chain briefly left the
    /// coalesced state (e.g. mid-reorg) is logged and retried on the next
    /// call, not treated as fatal.
    pub async fn on_block(&self) {
        if self.pruned.load(Ordering::SeqCst) {
            return;
        }
        if !self.store.is_coalesced() {
            return;
        }

        let running = !self.suspended.is_suspended();
        match self.store.prune() {
            Ok(()) => {
                self.pruned.store(true, Ordering::SeqCst);
                self.maybe_resume(running).await;
            }
            Err(err) => {
                warn!(error = %err, "prune attempt failed, will retry on next coalesced block");
            }
        }
    }

    /// `snap(height)`: takes a store snapshot, suspending peer channels for
    /// the duration of any table's `wait_lock` window (§4.7).
    pub async fn on_snap(&self, height: u64) -> Result<(), Code> {
        let running = !self.suspended.is_suspended();
        let bus = self.bus.clone();
        let suspended = self.suspended.clone();
        let mut saw_wait_lock = false;

        let mut progress = |event: StoreEvent, _table: StoreTable| {
            if matches!(event, StoreEvent::WaitLock) && !saw_wait_lock {
                saw_wait_lock = true;
                suspended.suspend();
                let bus = bus.clone();
                tokio::spawn(async move {
                    bus.publish(ChainEvent::new(
                        Component::Snapshot,
                        EventKind::Suspend,
                        EventValue::U64(height),
                        Code::Success,
                    ))
                    .await;
                });
            }
        };

        self.store.snapshot(&mut progress).map_err(Code::Store)?;
        self.maybe_resume(running).await;
        Ok(())
    }

    /// `resume`: the node-wide resume signal from some other component;
    /// the snapshot chaser has no state to react with beyond observing
    /// that the shared flag is now clear.
    pub fn on_resume(&self) {}

    async fn maybe_resume(&self, was_running_before: bool) {
        if was_running_before && !self.store.is_full() {
            self.suspended.resume();
            self.bus
                .publish(ChainEvent::new(
                    Component::Snapshot,
                    EventKind::Resume,
                    EventValue::Empty,
                    Code::Success,
                ))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bn_store::{ChainStore, MemoryStore};
    use shared_bus::InMemoryEventBus;
    use shared_types::entities::{Block, Header};

    fn genesis() -> Block {
        Block {
            header: Header {
                version: 1,
                previous_hash: [0u8; 32],
                merkle_root: [0u8; 32],
                time: 1_231_006_505,
                bits: 10,
                nonce: 0,
            },
            transactions: vec![],
        }
    }

    fn chaser(store: Arc<MemoryStore>) -> SnapshotChaser<MemoryStore> {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        SnapshotChaser::new(store, bus, SuspendState::new(), SnapshotSettings::default())
    }

    #[tokio::test]
    async fn prune_runs_once_the_chain_is_coalesced() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        assert!(store.is_coalesced());
        let c = chaser(store.clone());
        c.on_block().await;
        assert!(c.is_pruned());
    }

    #[tokio::test]
    async fn prune_runs_exactly_once() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let c = chaser(store.clone());
        c.on_block().await;
        let pruned_after_first = c.is_pruned();
        c.on_block().await;
        assert_eq!(pruned_after_first, c.is_pruned());
    }

    #[tokio::test]
    async fn snapshot_suspends_and_resumes_around_wait_lock() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let suspended = SuspendState::new();
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let c = SnapshotChaser::new(store, bus, suspended.clone(), SnapshotSettings::default());

        c.on_snap(0).await.expect("snapshot");
        assert!(!suspended.is_suspended());
    }

    #[tokio::test]
    async fn snapshot_does_not_resume_a_node_suspended_for_another_reason() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let suspended = SuspendState::new();
        suspended.suspend();
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let c = SnapshotChaser::new(store, bus, suspended.clone(), SnapshotSettings::default());

        c.on_snap(0).await.expect("snapshot");
        assert!(suspended.is_suspended());
    }
}
