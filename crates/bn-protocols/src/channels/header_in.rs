//! Header-in channel: requests headers by locator, organizes each one in
//! order, stops on a channel-scoped consensus error (§4.8).

use crate::domain::{locator_heights, ProtocolSettings};
use crate::handles::OrganizeHandle;
use crate::ports::PeerNetwork;
use bn_organize::ConsensusChecker;
use bn_store::ChainStore;
use shared_types::entities::{Candidate, Header};
use shared_types::errors::Code;
use std::sync::Arc;

/// One peer's header-first download channel.
pub struct HeaderInChannel<S, C, N> {
    store: Arc<S>,
    organize: Arc<OrganizeHandle<S, C>>,
    network: Arc<N>,
    settings: ProtocolSettings,
}

impl<S, C, N> HeaderInChannel<S, C, N>
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

    /// Issues `get_headers` with a locator built from the candidate chain
    /// tip.
    pub async fn request_headers(&self) {
        let tip = self.store.get_top_candidate();
        let locator: Vec<_> = locator_heights(tip, self.settings.max_locator)
            .into_iter()
            .filter_map(|h| self.store.get_header(self.store.to_candidate(h)))
            .map(|h| h.hash())
            .collect();
        self.network.send_get_headers(&locator, None).await;
    }

    /// `headers`: organizes each header in ascending order. A channel-scoped
    /// error (duplicate, orphan, checkpoint conflict, insufficient work)
    /// stops processing this batch without propagating; a fatal organize
    /// fault propagates for the caller to funnel through `fault()` (§7).
    ///
    /// An empty response is the send-headers handshake outcome (B1): there
    /// is nothing further to organize.
    pub async fn on_headers(&self, headers: Vec<Header>, now: u64) -> Result<(), Code> {
        for header in headers {
            let response = self
                .organize
                .organize(Candidate::HeaderOnly(header), now)
                .await;
            match response.code {
                Code::Success => {}
                Code::Channel(_) => return Ok(()),
                fatal => return Err(fatal),
            }
        }
        Ok(())
    }
}
