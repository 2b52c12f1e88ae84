//! A recording [`PeerNetwork`] fake for channel unit tests.

use crate::ports::{AnnounceFormat, GetDataItem, PeerNetwork};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::entities::Hash;

/// One outbound request/announcement the channel issued, captured for
/// test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    GetHeaders { locator: Vec<Hash>, stop: Option<Hash> },
    GetBlocks { locator: Vec<Hash>, stop: Option<Hash> },
    GetData { items: Vec<GetDataItem> },
    Announce { hash: Hash, format: AnnounceFormat },
}

/// A [`PeerNetwork`] that records everything sent instead of transmitting
/// it over a real connection.
#[derive(Default)]
pub struct RecordingPeerNetwork {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingPeerNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl PeerNetwork for RecordingPeerNetwork {
    async fn send_get_headers(&self, locator: &[Hash], stop: Option<Hash>) {
        self.sent.lock().push(Sent::GetHeaders {
            locator: locator.to_vec(),
            stop,
        });
    }

    async fn send_get_blocks(&self, locator: &[Hash], stop: Option<Hash>) {
        self.sent.lock().push(Sent::GetBlocks {
            locator: locator.to_vec(),
            stop,
        });
    }

    async fn send_get_data(&self, items: &[GetDataItem]) {
        self.sent.lock().push(Sent::GetData {
            items: items.to_vec(),
        });
    }

    async fn announce(&self, hash: Hash, format: AnnounceFormat) {
        self.sent.lock().push(Sent::Announce { hash, format });
    }
}
