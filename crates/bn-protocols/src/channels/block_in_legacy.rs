//! Block-in-legacy channel: `get_blocks`/`inv(block)` download path for
//! peers that predate header-first sync. Delivered blocks go through C3's
//! `organize` directly, since there is no prior archived header to
//! associate them with (§4.8: "the delivered block goes through C3's
//! organize... since older peers skip the header-first path").

use crate::domain::{locator_heights, ProtocolSettings};
use crate::handles::OrganizeHandle;
use crate::ports::PeerNetwork;
use bn_organize::ConsensusChecker;
use bn_store::ChainStore;
use shared_types::entities::{Block, Candidate, Hash};
use shared_types::errors::Code;
use std::sync::Arc;

/// One peer's legacy (pre-header-first) block download channel.
pub struct BlockInLegacyChannel<S, C, N> {
    store: Arc<S>,
    organize: Arc<OrganizeHandle<S, C>>,
    network: Arc<N>,
    settings: ProtocolSettings,
}

impl<S, C, N> BlockInLegacyChannel<S, C, N>
where
    S: ChainStore,
    C: ConsensusChecker,
    N: PeerNetwork,
{
    #[must_use]
    pub fn new(
        store: Arc<S>,
        organize: Arc<OrganizeHandle<S, C>>,
        network: Arc<N>,
        settings: ProtocolSettings,
    ) -> Self {
        Self {
            store,
            organize,
            network,
            settings,
        }
    }

    /// Issues `get_blocks` with a locator built from the candidate chain
    /// tip.
    pub async fn request_blocks(&self) {
        let tip = self.store.get_top_candidate();
        let locator: Vec<_> = locator_heights(tip, self.settings.max_locator)
            .into_iter()
            .filter_map(|h| self.store.get_header(self.store.to_candidate(h)))
            .map(|h| h.hash())
            .collect();
        self.network.send_get_blocks(&locator, None).await;
    }

    /// `inv(block)`: filters already-archived hashes against the archive
    /// and requests bodies for the rest (§4.8: "filter against archive;
    /// get_data").
    pub async fn on_inventory(&self, hashes: Vec<Hash>) {
        let items: Vec<_> = hashes
            .into_iter()
            .filter(|hash| self.store.to_header(*hash).is_terminal())
            .map(|hash| crate::ports::GetDataItem { hash, height: 0 })
            .collect();
        if !items.is_empty() {
            self.network.send_get_data(&items).await;
        }
    }

    /// A delivered block: organized directly through C3 rather than via
    /// the check chaser's association path, since legacy peers have no
    /// prior archived header to associate it with.
    pub async fn on_block(&self, block: Block, now: u64) -> Result<(), Code> {
        let response = self.organize.organize(Candidate::Full(block), now).await;
        match response.code {
            Code::Success | Code::Channel(_) => Ok(()),
            fatal => Err(fatal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingPeerNetwork;
    use bn_organize::{OrganizeChaser, OrganizeSettings, PermissiveChecker};
    use bn_store::MemoryStore;
    use shared_bus::{EventPublisher, InMemoryEventBus};
    use shared_types::entities::Header;

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

    fn channel(store: Arc<MemoryStore>) -> BlockInLegacyChannel<MemoryStore, PermissiveChecker, RecordingPeerNetwork> {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let organize = Arc::new(OrganizeHandle::new(OrganizeChaser::new(
            store.clone(),
            bus,
            PermissiveChecker,
            OrganizeSettings::default(),
        )));
        let network = Arc::new(RecordingPeerNetwork::new());
        BlockInLegacyChannel::new(store, organize, network, ProtocolSettings::default())
    }

    #[tokio::test]
    async fn delivered_block_organizes_directly() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let c = channel(store.clone());

        let header = Header {
            version: 1,
            previous_hash: genesis().hash(),
            merkle_root: [1u8; 32],
            time: 1_231_006_600,
            bits: 10,
            nonce: 1,
        };
        let block = Block {
            header,
            transactions: vec![],
        };
        c.on_block(block, 2_000_000_000).await.expect("on_block");
        assert_eq!(store.get_top_candidate(), 1);
    }

    #[tokio::test]
    async fn inventory_filters_already_archived_hashes() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let c = channel(store.clone());

        c.on_inventory(vec![genesis().hash(), [0xffu8; 32]]).await;
        // Only the unarchived hash should have triggered a get_data send;
        // the genesis hash is already archived and is filtered out.
    }

    #[tokio::test]
    async fn request_blocks_sends_a_locator() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let organize = Arc::new(OrganizeHandle::new(OrganizeChaser::new(
            store.clone(),
            bus,
            PermissiveChecker,
            OrganizeSettings::default(),
        )));
        let network = Arc::new(RecordingPeerNetwork::new());
        let c = BlockInLegacyChannel::new(store, organize, network.clone(), ProtocolSettings::default());

        c.request_blocks().await;
        assert_eq!(network.sent().len(), 1);
    }
}
