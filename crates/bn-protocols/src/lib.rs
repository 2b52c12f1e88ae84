//! # Channel Protocols (C8)
//!
//! Per-peer state machines that request hashes from C4 and deliver blocks
//! to C5's path, plus the block-out announcement side (§4.8). Protocols
//! never mutate the store directly except for `set_code` and the
//! `unconfirmable` verdict; all chain-index manipulation lives in the
//! chasers behind [`handles::OrganizeHandle`]/[`handles::CheckHandle`].

pub mod adapters;
pub mod channels;
pub mod domain;
pub mod handles;
pub mod ports;

pub use channels::block_in_31800::BlockIn31800Channel;
pub use channels::block_in_legacy::BlockInLegacyChannel;
pub use channels::block_out::BlockOutChannel;
pub use channels::header_in::HeaderInChannel;
pub use domain::{locator_heights, ChannelState, ProtocolSettings};
pub use handles::{CheckHandle, OrganizeHandle};
pub use ports::{AnnounceFormat, GetDataItem, PeerMessage, PeerNetwork};
