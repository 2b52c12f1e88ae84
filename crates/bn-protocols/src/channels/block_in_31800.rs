//! Block-in-31800 channel: requests a download map from C4, fetches
//! bodies by hash, and runs the header/body consistency check before
//! archiving (§4.8).

use crate::domain::ChannelState;
use crate::handles::CheckHandle;
use crate::ports::{GetDataItem, PeerNetwork};
use bn_organize::{CheckOutcome, ConsensusChecker};
use bn_store::ChainStore;
use shared_bus::{ChainEvent, Component, EventKind, EventPublisher, EventValue};
use shared_types::entities::{Block, Context, DownloadItem, Hash};
use shared_types::errors::Code;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Consensus flags that mark the claimed identity as malleated rather
/// than genuinely invalid (§4.8, I5): these never produce a persistent
/// `block_unconfirmable` verdict.
fn is_bypass_critical_malleation(outcome: CheckOutcome) -> bool {
    matches!(outcome, CheckOutcome::Malleated)
}

struct ChannelInner {
    state: ChannelState,
    outstanding: VecDeque<DownloadItem>,
}

/// One peer's 31800-style block download channel.
pub struct BlockIn31800Channel<S, C, N> {
    channel_key: u64,
    store: Arc<S>,
    check: Arc<CheckHandle<S>>,
    checker: Arc<C>,
    bus: Arc<dyn EventPublisher>,
    network: Arc<N>,
    inner: Mutex<ChannelInner>,
}

impl<S, C, N> BlockIn31800Channel<S, C, N>
where
    S: ChainStore,
    C: ConsensusChecker,
    N: PeerNetwork,
{
    #[must_use]
    pub fn new(
        channel_key: u64,
        store: Arc<S>,
        check: Arc<CheckHandle<S>>,
        checker: Arc<C>,
        bus: Arc<dyn EventPublisher>,
        network: Arc<N>,
    ) -> Self {
        Self {
            channel_key,
            store,
            check,
            checker,
            bus,
            network,
            inner: Mutex::new(ChannelInner {
                state: ChannelState::Idle,
                outstanding: VecDeque::new(),
            }),
        }
    }

    #[must_use]
    pub async fn state(&self) -> ChannelState {
        self.inner.lock().await.state
    }

    /// `get_hashes` from C4; on a non-empty map, issues `get_data` for
    /// every item (§4.8: idle -> requesting).
    pub async fn pull_work(&self) {
        let Some(map) = self.check.get_hashes(self.channel_key).await else {
            return;
        };
        if map.is_empty() {
            return;
        }
        let items: Vec<GetDataItem> = map
            .iter()
            .map(|d| GetDataItem {
                hash: d.hash,
                height: d.height,
            })
            .collect();
        self.network.send_get_data(&items).await;

        let mut inner = self.inner.lock().await;
        inner.outstanding = map.into_iter().collect();
        inner.state = inner.state.on_get_hashes_success();
    }

    /// A delivered block: verified against the outstanding map, then run
    /// through the header/body consistency check.
    pub async fn on_block(&self, block: Block, context: Context) -> Result<(), Code> {
        let hash = block.hash();
        let item = {
            let mut inner = self.inner.lock().await;
            let position = inner.outstanding.iter().position(|d| d.hash == hash);
            let Some(position) = position else {
                // Unrequested bodies are tolerated and ignored (§6).
                return Ok(());
            };
            let item = inner.outstanding.remove(position).expect("position in bounds");
            inner.state = inner.state.on_first_block();
            item
        };

        let outcome = self.checker.check_block(&block, &context);
        match outcome {
            CheckOutcome::Valid => {
                let bypass = self.store.is_milestone(item.link) || self.store.is_under_checkpoint(item.height);
                self.store
                    .set_code(item.link, &block, bypass)
                    .map_err(Code::Store)?;
                self.bus
                    .publish(ChainEvent::new(
                        Component::Protocols,
                        EventKind::Checked,
                        EventValue::U64(item.height),
                        Code::Success,
                    ))
                    .await;
            }
            CheckOutcome::Malleated if is_bypass_critical_malleation(outcome) => {
                let mut inner = self.inner.lock().await;
                inner.state = inner.state.on_fatal();
                return Ok(());
            }
            _ => {
                self.store
                    .set_block_unconfirmable(item.link)
                    .map_err(Code::Store)?;
                self.bus
                    .publish(ChainEvent::new(
                        Component::Protocols,
                        EventKind::Unchecked,
                        EventValue::U64(item.height),
                        Code::Success,
                    ))
                    .await;
            }
        }

        let emptied = {
            let mut inner = self.inner.lock().await;
            let emptied = inner.outstanding.is_empty();
            if emptied {
                inner.state = inner.state.on_map_emptied();
            }
            emptied
        };
        let _ = emptied;
        Ok(())
    }

    /// `purge`: clears the outstanding map unconditionally and stops the
    /// channel (§4.8: "sacrificed_channel").
    pub async fn on_purge(&self) {
        let mut inner = self.inner.lock().await;
        inner.outstanding.clear();
        inner.state = inner.state.on_purge();
        self.check.on_purge(self.channel_key).await;
    }

    #[must_use]
    pub fn channel_key(&self) -> u64 {
        self.channel_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingPeerNetwork;
    use bn_check::{CheckChaser, CheckSettings};
    use bn_organize::PermissiveChecker;
    use bn_store::MemoryStore;
    use shared_bus::InMemoryEventBus;
    use shared_types::entities::{ConsensusFlags, Header};

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

    fn archived_header(store: &MemoryStore, parent: Hash, nonce: u32, height: u64) -> (shared_types::entities::Link, Block) {
        let header = Header {
            version: 1,
            previous_hash: parent,
            merkle_root: [nonce as u8; 32],
            time: 1_231_006_505 + nonce,
            bits: 10,
            nonce,
        };
        let ctx = Context {
            flags: ConsensusFlags::NONE,
            height,
            median_time_past: 0,
        };
        let link = store.set_link(&header, ctx);
        (link, Block { header, transactions: vec![] })
    }

    #[tokio::test]
    async fn unrequested_block_is_ignored() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let check = Arc::new(CheckHandle::new(CheckChaser::new(store.clone(), bus.clone(), CheckSettings::default())));
        let network = Arc::new(RecordingPeerNetwork::new());
        let channel = BlockIn31800Channel::new(1, store.clone(), check, Arc::new(PermissiveChecker), bus, network);

        let (_link, block) = archived_header(&store, genesis().hash(), 1, 1);
        let ctx = Context {
            flags: ConsensusFlags::NONE,
            height: 1,
            median_time_past: 0,
        };
        channel.on_block(block, ctx).await.expect("on_block");
        assert_eq!(channel.state().await, ChannelState::Idle);
    }

    #[tokio::test]
    async fn requested_valid_block_is_archived_and_checked() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let (link, block) = archived_header(&store, genesis().hash(), 1, 1);
        store.push_candidate(link).expect("push");
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let check = Arc::new(CheckHandle::new(CheckChaser::new(store.clone(), bus.clone(), CheckSettings::default())));
        let network = Arc::new(RecordingPeerNetwork::new());
        let channel = BlockIn31800Channel::new(1, store.clone(), check, Arc::new(PermissiveChecker), bus, network);

        {
            let mut inner = channel.inner.lock().await;
            inner.outstanding.push_back(DownloadItem {
                hash: block.hash(),
                height: 1,
                link,
            });
            inner.state = ChannelState::Requesting;
        }

        let ctx = Context {
            flags: ConsensusFlags::NONE,
            height: 1,
            median_time_past: 0,
        };
        channel.on_block(block, ctx).await.expect("on_block");
        assert!(store.is_associated(link));
        assert_eq!(channel.state().await, ChannelState::Idle);
    }

    #[tokio::test]
    async fn purge_clears_the_map_and_stops_the_channel() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let check = Arc::new(CheckHandle::new(CheckChaser::new(store.clone(), bus.clone(), CheckSettings::default())));
        let network = Arc::new(RecordingPeerNetwork::new());
        let channel = BlockIn31800Channel::new(1, store, check, Arc::new(PermissiveChecker), bus, network);

        channel.on_purge().await;
        assert_eq!(channel.state().await, ChannelState::Purging);
    }
}
