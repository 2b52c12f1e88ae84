//! S6 (§8): a channel stalls partway through its map, and the chaser
//! splits it rather than waiting on the slow peer for the whole thing.

use super::fixtures::{bus, genesis};
use bn_check::{CheckChaser, CheckSettings};
use bn_store::{ChainStore, MemoryStore};
use shared_types::entities::{ConsensusFlags, Context, Header};
use std::sync::Arc;

fn store_with_unassociated_headers(n: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");
    let mut parent = genesis().hash();
    for i in 1..=n {
        let header = Header {
            version: 1,
            previous_hash: parent,
            merkle_root: [i as u8; 32],
            time: 1_231_006_505 + i as u32,
            bits: 10,
            nonce: i as u32,
        };
        let ctx = Context {
            flags: ConsensusFlags::NONE,
            height: i,
            median_time_past: 0,
        };
        let link = store.set_link(&header, ctx);
        store.push_candidate(link).expect("push");
        parent = header.hash();
    }
    store
}

#[tokio::test]
async fn a_stalled_map_splits_and_the_back_half_is_handed_to_a_second_channel() {
    let store = store_with_unassociated_headers(10);
    let mut check = CheckChaser::new(store, bus(), CheckSettings::default());
    check.set_peer_count(1);
    check.on_window_signal(10, true).await;
    assert_eq!(check.queued_maps(), 1);

    let first_map = check.get_hashes(1).await.expect("map handed to channel 1");
    assert_eq!(first_map.len(), 10);

    check.on_stall().await;
    assert_eq!(check.queued_maps(), 1, "the back half returns to the queue");

    let second_map = check.get_hashes(2).await.expect("map handed to channel 2");
    assert_eq!(first_map.len() - second_map.len(), 5, "front half keeps 5, back half hands out 5");
}

#[tokio::test]
async fn a_channel_with_no_queued_work_is_reported_starved() {
    let store = store_with_unassociated_headers(0);
    let mut check = CheckChaser::new(store, bus(), CheckSettings::default());
    assert!(check.get_hashes(1).await.is_none());
}
