//! One `tokio::task` per bus-driven chaser, each owning the only handle
//! that ever calls into its chaser in response to events — the concrete
//! realization of §5.1's "every external call is a message sent into that
//! task's inbound channel" for the four chasers downstream of organize.
//!
//! The organize chaser itself has no reactor here: it is driven directly
//! by inbound peer deliveries through `bn_protocols::handles::OrganizeHandle`,
//! never by a bus event, matching §4.3 ("ingests candidates" from the wire,
//! not from the bus).

use crate::container::handles::{ConfirmHandle, SnapshotHandle, ValidateHandle};
use bn_protocols::{CheckHandle, OrganizeHandle};
use bn_store::ChainStore;
use bn_validate::BlockValidator;
use shared_bus::{Component, EventFilter, EventKind, EventTopic, InMemoryEventBus};
use std::sync::Arc;
use tracing::{debug, warn};

/// Spawns the check chaser's reactor: rescans the download window on
/// `bump`/`headers`, advances `position_` on `checked`, tracks
/// `confirmed_` on `confirmable`, and purges on `regressed`/`disorganized`
/// (§4.4). Takes the same [`CheckHandle`] the peer channels call into, so
/// the reactor and the channels serialize against one chaser instance
/// rather than two that could silently diverge.
pub fn spawn_check_reactor<S>(bus: Arc<InMemoryEventBus>, check: Arc<CheckHandle<S>>)
where
    S: ChainStore + 'static,
{
    tokio::spawn(async move {
        let mut sub = bus.subscribe(EventFilter::topics(vec![
            EventTopic::Component(Component::Organize),
            EventTopic::Component(Component::Confirm),
            EventTopic::Component(Component::Protocols),
        ]));
        while let Some(event) = sub.recv().await {
            match event.kind {
                EventKind::Start | EventKind::Bump | EventKind::Headers => {
                    let top = event.value.as_u64().unwrap_or(0);
                    check.on_window_signal(top, true).await;
                }
                EventKind::Regressed | EventKind::Disorganized => {
                    let branch_point = event.value.as_u64().unwrap_or(0);
                    check.on_regressed_or_disorganized(branch_point).await;
                }
                EventKind::Confirmable => {
                    let height = event.value.as_u64().unwrap_or(0);
                    check.on_confirmable(height, height, true).await;
                }
                EventKind::Checked => check.on_checked().await,
                EventKind::Stall => check.on_stall().await,
                _ => {}
            }
        }
        debug!("check reactor stopped: bus closed");
    });
}

/// Spawns the validate chaser's reactor: `do_bump` on chain-state signals
/// plus a periodic drain of worker completions, since workers deliver
/// through an internal channel only the owning task polls (§4.5.1).
pub fn spawn_validate_reactor<S, V>(bus: Arc<InMemoryEventBus>, validate: Arc<ValidateHandle<S, V>>)
where
    S: ChainStore + 'static,
    V: BlockValidator + 'static,
{
    tokio::spawn(async move {
        let mut sub = bus.subscribe(EventFilter::topics(vec![
            EventTopic::Component(Component::Check),
            EventTopic::Component(Component::Organize),
        ]));
        loop {
            tokio::select! {
                event = sub.recv() => {
                    let Some(event) = event else {
                        debug!("validate reactor stopped: bus closed");
                        break;
                    };
                    if matches!(event.kind, EventKind::Start | EventKind::Bump | EventKind::Checked | EventKind::Regressed | EventKind::Disorganized) {
                        validate.on_bump().await;
                    }
                }
                () = tokio::time::sleep(std::time::Duration::from_millis(50)) => {
                    validate.drain_completions().await;
                }
            }
            if let Some(fault) = validate.fault().await {
                warn!(?fault, "validate chaser recorded a fatal fault");
            }
        }
    });
}

/// Spawns the confirm chaser's reactor: one promotion pass per `valid`/
/// `regressed`/`disorganized` signal (§4.6). `network_height` is
/// approximated by the candidate tip, since real peer-height tracking
/// belongs to the out-of-scope peer protocol layer (§1).
pub fn spawn_confirm_reactor<S>(bus: Arc<InMemoryEventBus>, confirm: Arc<ConfirmHandle<S>>, store: Arc<S>)
where
    S: ChainStore + 'static,
{
    tokio::spawn(async move {
        let mut sub = bus.subscribe(EventFilter::topics(vec![EventTopic::Component(Component::Validate)]));
        while let Some(event) = sub.recv().await {
            if !matches!(
                event.kind,
                EventKind::Start | EventKind::Valid | EventKind::Regressed | EventKind::Disorganized
            ) {
                continue;
            }
            let network_height = store.get_top_candidate();
            let is_current = store
                .get_candidate_chain_state(network_height)
                .map_or(true, |state| state.is_current);
            if let Err(fault) = confirm.on_event(network_height, is_current).await {
                warn!(?fault, "confirm chaser recorded a fatal fault");
            }
        }
        debug!("confirm reactor stopped: bus closed");
    });
}

/// Spawns the snapshot chaser's reactor: the one-shot prune on `block`,
/// a snapshot on `snap`, and the resume observer on `resume` (§4.7).
pub fn spawn_snapshot_reactor<S>(bus: Arc<InMemoryEventBus>, snapshot: Arc<SnapshotHandle<S>>)
where
    S: ChainStore + 'static,
{
    tokio::spawn(async move {
        let mut sub = bus.subscribe(EventFilter::topics(vec![
            EventTopic::Component(Component::Confirm),
            EventTopic::Component(Component::Snapshot),
        ]));
        while let Some(event) = sub.recv().await {
            match event.kind {
                EventKind::Block => snapshot.on_block().await,
                EventKind::Snap => {
                    let height = event.value.as_u64().unwrap_or(0);
                    if let Err(err) = snapshot.on_snap(height).await {
                        warn!(?err, "snapshot attempt failed");
                    }
                }
                EventKind::Resume => snapshot.on_resume().await,
                _ => {}
            }
        }
        debug!("snapshot reactor stopped: bus closed");
    });
}

/// Re-exports the organize handle type so `container::mod` doesn't need a
/// separate import path for the one chaser with no reactor of its own.
pub type Organize<S, C> = OrganizeHandle<S, C>;

/// Spawns the organize chaser's disorganize reactor: `unchecked`,
/// `unvalid`, and `unconfirmable` events each name a height whose
/// candidate link must be pushed back into the cache tree down to the
/// fork point (§4.3: "Disorganization"). This is the one signal path into
/// `organize` that does not come from a peer delivery.
pub fn spawn_disorganize_reactor<S, C>(bus: Arc<InMemoryEventBus>, organize: Arc<OrganizeHandle<S, C>>, store: Arc<S>)
where
    S: ChainStore + 'static,
    C: bn_organize::ConsensusChecker + 'static,
{
    tokio::spawn(async move {
        let mut sub = bus.subscribe(EventFilter::topics(vec![
            EventTopic::Component(Component::Validate),
            EventTopic::Component(Component::Protocols),
        ]));
        while let Some(event) = sub.recv().await {
            if !matches!(event.kind, EventKind::Unvalid | EventKind::Unconfirmable | EventKind::Unchecked) {
                continue;
            }
            let Some(height) = event.value.as_u64() else {
                continue;
            };
            let link = store.to_candidate(height);
            if link.is_terminal() {
                continue;
            }
            if let Err(code) = organize.disorganize(link, height).await {
                warn!(?code, height, "disorganize failed");
            }
        }
        debug!("disorganize reactor stopped: bus closed");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bn_check::{CheckChaser, CheckSettings};
    use bn_confirm::ConfirmChaser;
    use bn_confirm::ConfirmSettings as ConfirmSettingsType;
    use bn_organize::PermissiveChecker;
    use bn_snapshot::{SnapshotChaser, SnapshotSettings};
    use bn_store::MemoryStore;
    use bn_validate::{PermissiveValidator, ValidateChaser, ValidateSettings};
    use shared_bus::{ChainEvent, EventPublisher, EventValue, SuspendState};
    use shared_types::entities::{Block, Header};
    use shared_types::errors::Code;
    use std::time::Duration;

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

    #[tokio::test]
    async fn check_reactor_reacts_to_a_bump_event() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let bus = Arc::new(InMemoryEventBus::new());
        let bus_dyn: Arc<dyn EventPublisher> = bus.clone();
        let check = Arc::new(CheckHandle::new(CheckChaser::new(store, bus_dyn.clone(), CheckSettings::default())));
        spawn_check_reactor(bus.clone(), check.clone());

        bus.publish(ChainEvent::new(Component::Organize, EventKind::Bump, EventValue::U64(0), Code::Success))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(check.queued_maps().await, 0, "no peers means no map was queued despite the bump");
    }

    #[tokio::test]
    async fn confirm_reactor_promotes_on_valid_event() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");

        let header = Header {
            version: 1,
            previous_hash: genesis().hash(),
            merkle_root: [1u8; 32],
            time: 1_231_006_600,
            bits: 10,
            nonce: 1,
        };
        let ctx = shared_types::entities::Context {
            flags: shared_types::entities::ConsensusFlags::NONE,
            height: 1,
            median_time_past: 0,
        };
        let link = store.set_link(&header, ctx);
        let block = Block { header, transactions: vec![] };
        store.set_code(link, &block, false).expect("set_code");
        store.push_candidate(link).expect("push_candidate");
        store.set_block_valid(link, 0).expect("set_block_valid");

        let bus = Arc::new(InMemoryEventBus::new());
        let bus_dyn: Arc<dyn EventPublisher> = bus.clone();
        let confirm = Arc::new(ConfirmHandle::new(ConfirmChaser::new(store.clone(), bus_dyn.clone(), ConfirmSettingsType::default())));
        spawn_confirm_reactor(bus.clone(), confirm, store.clone());

        bus.publish(ChainEvent::new(Component::Validate, EventKind::Valid, EventValue::U64(1), Code::Success))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get_top_confirmed(), 1);
    }

    #[tokio::test]
    async fn snapshot_reactor_prunes_on_block_event() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let bus = Arc::new(InMemoryEventBus::new());
        let bus_dyn: Arc<dyn EventPublisher> = bus.clone();
        let snapshot = Arc::new(SnapshotHandle::new(SnapshotChaser::new(
            store.clone(),
            bus_dyn,
            SuspendState::new(),
            SnapshotSettings::default(),
        )));
        spawn_snapshot_reactor(bus.clone(), snapshot.clone());

        bus.publish(ChainEvent::new(Component::Confirm, EventKind::Block, EventValue::U64(0), Code::Success))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(snapshot.is_pruned().await);
    }

    #[tokio::test]
    async fn validate_reactor_drains_completions_periodically() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let header = Header {
            version: 1,
            previous_hash: genesis().hash(),
            merkle_root: [1u8; 32],
            time: 1_231_006_600,
            bits: 10,
            nonce: 1,
        };
        let ctx = shared_types::entities::Context {
            flags: shared_types::entities::ConsensusFlags::NONE,
            height: 1,
            median_time_past: 0,
        };
        let link = store.set_link(&header, ctx);
        let block = Block { header, transactions: vec![] };
        store.set_code(link, &block, false).expect("set_code");
        store.push_candidate(link).expect("push_candidate");

        let bus = Arc::new(InMemoryEventBus::new());
        let bus_dyn: Arc<dyn EventPublisher> = bus.clone();
        let validate = Arc::new(ValidateHandle::new(ValidateChaser::new(
            store.clone(),
            bus_dyn,
            PermissiveValidator,
            ValidateSettings::default(),
        )));
        validate.set_mature(true).await;
        spawn_validate_reactor(bus.clone(), validate.clone());

        bus.publish(ChainEvent::new(Component::Check, EventKind::Checked, EventValue::U64(1), Code::Success))
            .await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.get_block_state(link), shared_types::entities::BlockState::BlockValid);
    }

    #[tokio::test]
    async fn disorganize_reactor_rolls_back_a_rejected_height_on_unvalid() {
        use bn_organize::{OrganizeChaser, OrganizeSettings};

        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let bus = Arc::new(InMemoryEventBus::new());
        let bus_dyn: Arc<dyn EventPublisher> = bus.clone();

        let mut chaser = OrganizeChaser::new(store.clone(), bus_dyn.clone(), PermissiveChecker, OrganizeSettings::default());
        let header = Header {
            version: 1,
            previous_hash: genesis().hash(),
            merkle_root: [1u8; 32],
            time: 1_231_006_600,
            bits: 10,
            nonce: 1,
        };
        let response = chaser
            .organize(shared_types::entities::Candidate::HeaderOnly(header), 2_000_000_000)
            .await;
        assert!(response.code.is_success());
        assert_eq!(store.get_top_candidate(), 1);

        let organize = Arc::new(OrganizeHandle::new(chaser));
        spawn_disorganize_reactor(bus.clone(), organize, store.clone());

        bus.publish(ChainEvent::new(Component::Validate, EventKind::Unvalid, EventValue::U64(1), Code::Success))
            .await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get_top_candidate(), 0, "the rejected height rolls back out of the candidate chain");
    }
}
