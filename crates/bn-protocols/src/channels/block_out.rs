//! Block-out channel: announces newly confirmed blocks to one peer in
//! its negotiated format, skipping the peer that originated the block
//! (§4.8: "announces... respecting any blacklist of the originator").

use crate::ports::{AnnounceFormat, PeerNetwork};
use bn_store::ChainStore;
use parking_lot::Mutex;
use shared_types::entities::Hash;
use std::sync::Arc;

/// One peer's block announcement channel.
pub struct BlockOutChannel<S, N> {
    channel_key: u64,
    store: Arc<S>,
    network: Arc<N>,
    format: AnnounceFormat,
    /// The most recent originator to skip, set by the channel that
    /// delivered the block so it never echoes it back to its own source.
    last_originator: Mutex<Option<u64>>,
}

impl<S, N> BlockOutChannel<S, N>
where
    S: ChainStore,
    N: PeerNetwork,
{
    #[must_use]
    pub fn new(channel_key: u64, store: Arc<S>, network: Arc<N>, format: AnnounceFormat) -> Self {
        Self {
            channel_key,
            store,
            network,
            format,
            last_originator: Mutex::new(None),
        }
    }

    /// Records that `originator` delivered the block at `height`, so a
    /// subsequent `on_block` for that height is not echoed back to it.
    pub fn note_originator(&self, originator: u64) {
        *self.last_originator.lock() = Some(originator);
    }

    /// `block(link)`: announces the block at `height` unless this channel
    /// is the one that delivered it.
    pub async fn on_block(&self, height: u64, originator: Option<u64>) {
        if originator == Some(self.channel_key) {
            return;
        }
        let link = self.store.to_confirmed(height);
        let Some(header) = self.store.get_header(link) else {
            return;
        };
        self.network.announce(header.hash(), self.format).await;
    }

    #[must_use]
    pub fn channel_key(&self) -> u64 {
        self.channel_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{RecordingPeerNetwork, Sent};
    use bn_store::MemoryStore;
    use shared_types::entities::{Block, Context, ConsensusFlags, Header};

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

    fn store_with_confirmed_block() -> (Arc<MemoryStore>, Hash) {
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
        let hash = header.hash();
        let ctx = Context {
            flags: ConsensusFlags::NONE,
            height: 1,
            median_time_past: 0,
        };
        let link = store.set_link(&header, ctx);
        store.push_candidate(link).expect("push_candidate");
        store.push_confirmed(link, true).expect("push_confirmed");
        (store, hash)
    }

    #[tokio::test]
    async fn announces_a_confirmed_block_to_an_uninvolved_peer() {
        let (store, hash) = store_with_confirmed_block();
        let network = Arc::new(RecordingPeerNetwork::new());
        let channel = BlockOutChannel::new(2, store, network.clone(), AnnounceFormat::Inventory);

        channel.on_block(1, Some(1)).await;
        assert_eq!(
            network.sent(),
            vec![Sent::Announce {
                hash,
                format: AnnounceFormat::Inventory
            }]
        );
    }

    #[tokio::test]
    async fn skips_announcing_back_to_the_originating_channel() {
        let (store, _hash) = store_with_confirmed_block();
        let network = Arc::new(RecordingPeerNetwork::new());
        let channel = BlockOutChannel::new(1, store, network.clone(), AnnounceFormat::Headers);

        channel.on_block(1, Some(1)).await;
        assert!(network.sent().is_empty());
    }

    #[tokio::test]
    async fn announces_in_the_negotiated_headers_format() {
        let (store, hash) = store_with_confirmed_block();
        let network = Arc::new(RecordingPeerNetwork::new());
        let channel = BlockOutChannel::new(5, store, network.clone(), AnnounceFormat::Headers);

        channel.on_block(1, None).await;
        assert_eq!(
            network.sent(),
            vec![Sent::Announce {
                hash,
                format: AnnounceFormat::Headers
            }]
        );
    }
}
