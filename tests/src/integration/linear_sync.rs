//! S1 (§8): a linear run of full blocks from genesis through organize,
//! validate, and confirm, each chaser handed off from the previous one's
//! published events rather than by reaching into another chaser's state.

use super::fixtures::{block_on, bus, genesis, permissive_settings, settle};
use bn_confirm::{ConfirmChaser, ConfirmSettings};
use bn_organize::{OrganizeChaser, PermissiveChecker};
use bn_store::{ChainStore, MemoryStore};
use bn_validate::{PermissiveValidator, ValidateChaser, ValidateSettings};
use shared_types::entities::{BlockState, Candidate};
use std::sync::Arc;

#[tokio::test]
async fn five_full_blocks_sync_from_genesis_to_confirmed() {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");

    let mut organize = OrganizeChaser::new(store.clone(), bus(), PermissiveChecker, permissive_settings());
    let mut validate = ValidateChaser::new(store.clone(), bus(), PermissiveValidator, ValidateSettings::default());
    validate.set_mature(true);
    let mut confirm = ConfirmChaser::new(store.clone(), bus(), ConfirmSettings::default());

    let mut parent = genesis().hash();
    for i in 1..=5u32 {
        let block = block_on(parent, i, 10);
        parent = block.header.hash();
        let response = organize.organize(Candidate::Full(block), 2_000_000_000).await;
        assert!(response.code.is_success(), "block {i} must organize cleanly");
    }
    assert_eq!(store.get_top_candidate(), 5);

    validate.on_bump().await;
    settle(&mut validate).await;
    assert_eq!(validate.fault(), None);
    for h in 1..=5 {
        let link = store.to_candidate(h);
        assert_eq!(store.get_block_state(link), BlockState::BlockValid, "height {h} must validate");
    }

    confirm.on_event(5, true).await.expect("confirm");
    assert_eq!(store.get_top_confirmed(), 5);
    for h in 1..=5 {
        assert_eq!(store.to_confirmed(h), store.to_candidate(h));
    }
}

#[tokio::test]
async fn confirm_is_a_no_op_when_nothing_new_validated() {
    let store = Arc::new(MemoryStore::new(vec![], None));
    store.initialize(&genesis()).expect("initialize");
    let mut confirm = ConfirmChaser::new(store.clone(), bus(), ConfirmSettings::default());
    confirm.on_event(0, true).await.expect("confirm");
    assert_eq!(store.get_top_confirmed(), 0);
}
