//! S5 (§8): a store snapshot taken mid-operation suspends peer channels
//! for the duration of the table's `wait_lock` window and resumes them
//! once the snapshot settles.

use super::fixtures::{bus, genesis};
use bn_snapshot::{SnapshotChaser, SnapshotSettings};
use bn_store::{ChainStore, MemoryStore};
use shared_bus::SuspendState;
use std::sync::Arc;

#[tokio::test]
async fn snapshot_suspends_and_resumes_the_shared_flag() {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");
    let suspend = SuspendState::new();
    let snapshot = SnapshotChaser::new(store, bus(), suspend.clone(), SnapshotSettings::default());

    assert!(!suspend.is_suspended());
    snapshot.on_snap(1).await.expect("snapshot");
    assert!(!suspend.is_suspended(), "the flag resumes once the snapshot settles");
}

#[tokio::test]
async fn a_node_already_suspended_for_another_reason_stays_suspended() {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");
    let suspend = SuspendState::new();
    suspend.suspend();
    let snapshot = SnapshotChaser::new(store, bus(), suspend.clone(), SnapshotSettings::default());

    snapshot.on_snap(1).await.expect("snapshot");
    assert!(suspend.is_suspended(), "snapshot must not clear a pre-existing external suspension");
}

#[tokio::test]
async fn the_one_shot_prune_runs_once_and_does_not_repeat() {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");
    let snapshot = SnapshotChaser::new(store, bus(), SuspendState::new(), SnapshotSettings::default());

    assert!(!snapshot.is_pruned());
    snapshot.on_block().await;
    assert!(snapshot.is_pruned());
    snapshot.on_block().await;
    assert!(snapshot.is_pruned(), "idempotent after the first prune");
}
