//! Shared chain-building helpers for the scenario tests. Mirrors the
//! genesis/header fixtures every chaser crate already tests against.

use bn_organize::OrganizeSettings;
use shared_types::entities::{Block, Hash, Header};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn genesis() -> Block {
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

pub(crate) fn block_on(parent: Hash, nonce: u32, bits: u32) -> Block {
    Block {
        header: Header {
            version: 1,
            previous_hash: parent,
            merkle_root: [nonce as u8; 32],
            time: 1_231_006_505 + nonce,
            bits,
            nonce,
        },
        transactions: vec![],
    }
}

pub(crate) fn permissive_settings() -> OrganizeSettings {
    OrganizeSettings {
        checkpoints: vec![],
        milestone: None,
        minimum_work: 0,
        currency_window_minutes: 0,
    }
}

/// Drains a validate chaser's completions until its backlog empties,
/// polling rather than blocking since dispatch runs on spawned tasks.
pub(crate) async fn settle<S, V>(chaser: &mut bn_validate::ValidateChaser<S, V>)
where
    S: bn_store::ChainStore + 'static,
    V: bn_validate::BlockValidator + 'static,
{
    for _ in 0..200 {
        chaser.drain_completions().await;
        if chaser.backlog() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub(crate) fn bus() -> Arc<dyn shared_bus::EventPublisher> {
    Arc::new(shared_bus::InMemoryEventBus::new())
}
