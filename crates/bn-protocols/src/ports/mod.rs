//! # Peer Network Port
//!
//! The abstract peer collaborator every channel protocol sends requests
//! to and receives wire messages from (§1: "it consumes an abstract peer
//! network"). A production adapter maps these to the actual wire messages
//! named in §6 (`get_headers`, `get_data`, `get_blocks`, `inv`/`headers`);
//! tests substitute a recording fake.

use async_trait::async_trait;
use shared_types::entities::{Block, Hash, Header};

/// The announcement format a peer has negotiated for new confirmed blocks
/// (§4.8: "`send_headers`/`send_compact`" negotiation outcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceFormat {
    /// Announce via `inv(block)`.
    Inventory,
    /// Announce via `headers` (peer sent `send_headers`).
    Headers,
}

/// A peer-addressed download item, matching the wire `get_data` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetDataItem {
    pub hash: Hash,
    pub height: u64,
}

/// Outbound requests and announcements a channel can send to its peer.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Sends `get_headers` with the given locator and optional stop hash.
    async fn send_get_headers(&self, locator: &[Hash], stop: Option<Hash>);
    /// Sends `get_blocks` with the given locator and optional stop hash.
    async fn send_get_blocks(&self, locator: &[Hash], stop: Option<Hash>);
    /// Requests bodies for the given hashes.
    async fn send_get_data(&self, items: &[GetDataItem]);
    /// Announces a newly confirmed block in the peer's negotiated format.
    async fn announce(&self, hash: Hash, format: AnnounceFormat);
}

/// Inbound wire messages a channel processes. Mirrors the subset of §6's
/// message list this core consumes; connection setup/teardown and
/// non-block-relevant messages (`fee_filter`, `mempool`, `send_compact`)
/// are the transport adapter's concern, not the channel's.
#[derive(Debug, Clone)]
pub enum PeerMessage {
    /// Response to `get_headers`: zero or more headers, ascending.
    Headers(Vec<Header>),
    /// Response to `get_blocks`: an inventory of block hashes.
    Inventory(Vec<Hash>),
    /// A delivered block body.
    Block(Block),
    /// The peer reported a requested item as unavailable.
    NotFound(Hash),
}
