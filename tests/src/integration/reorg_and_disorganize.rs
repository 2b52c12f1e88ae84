//! S2/S3 (§8): a higher-work branch reorganizes the candidate chain, and a
//! block that later fails validation gets rolled back out of it via
//! disorganize — the same call the bus-driven disorganize reactor makes in
//! response to `unvalid`/`unconfirmable` (bn-node's container/reactors.rs).

use super::fixtures::{block_on, bus, genesis, permissive_settings};
use bn_check::{CheckChaser, CheckSettings};
use bn_organize::{OrganizeChaser, PermissiveChecker};
use bn_store::{ChainStore, MemoryStore};
use shared_types::entities::Candidate;
use std::sync::Arc;

#[tokio::test]
async fn higher_work_branch_reorganizes_then_rolls_back_on_disorganize() {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");
    let mut organize = OrganizeChaser::new(store.clone(), bus(), PermissiveChecker, permissive_settings());

    let a1 = block_on(genesis().hash(), 1, 10);
    let r1 = organize.organize(Candidate::Full(a1.clone()), 2_000_000_000).await;
    assert!(r1.code.is_success());
    assert_eq!(store.get_top_candidate(), 1);

    let a2 = block_on(a1.header.hash(), 2, 10);
    let r2 = organize.organize(Candidate::Full(a2.clone()), 2_000_000_000).await;
    assert!(r2.code.is_success());
    assert_eq!(store.get_top_candidate(), 2);

    // A competing branch at height 1 with strictly more work reorganizes
    // even though it arrives after the a1/a2 chain is already the tip.
    let b1 = block_on(genesis().hash(), 9, 40);
    let rb1 = organize.organize(Candidate::Full(b1.clone()), 2_000_000_000).await;
    assert!(rb1.code.is_success());
    assert_eq!(store.get_top_candidate(), 1, "the weaker a1/a2 branch is evicted back to the fork point");
    assert_eq!(store.to_candidate(1), rb1.link.unwrap());

    let b2 = block_on(b1.header.hash(), 10, 10);
    let rb2 = organize.organize(Candidate::Full(b2.clone()), 2_000_000_000).await;
    assert!(rb2.code.is_success());
    assert_eq!(store.get_top_candidate(), 2);
    let b2_link = rb2.link.unwrap();

    // b2 is later rejected by validate (simulating the reactor observing
    // an `unvalid`/`unconfirmable` event for height 2).
    organize.disorganize(b2_link, 2).await.expect("disorganize");
    assert_eq!(store.get_top_candidate(), 1, "the rejected height rolls back out of the candidate chain");
    assert_eq!(organize.cache_len(), 1, "b1 returns to the cache, b2 does not");
}

#[tokio::test]
async fn check_chaser_purges_outstanding_work_on_disorganize_notice() {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");
    let mut organize = OrganizeChaser::new(store.clone(), bus(), PermissiveChecker, permissive_settings());

    let mut parent = genesis().hash();
    for i in 1..=3u32 {
        let header_only = block_on(parent, i, 10).header;
        parent = header_only.hash();
        organize
            .organize(shared_types::entities::Candidate::HeaderOnly(header_only), 2_000_000_000)
            .await;
    }

    let mut check = CheckChaser::new(store.clone(), bus(), CheckSettings::default());
    check.set_peer_count(1);
    check.on_window_signal(3, true).await;
    assert_eq!(check.queued_maps(), 1);
    let _map = check.get_hashes(1).await.expect("map");

    // The branch point regresses to the fork (0); outstanding work for the
    // evicted heights must be purged rather than handed out again.
    check.on_regressed_or_disorganized(0).await;
    assert_eq!(check.queued_maps(), 0);
}
