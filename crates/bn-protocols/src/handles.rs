//! Shared access to the organize and check chasers for concurrent peer
//! channels.
//!
//! §5.1 notes that a chaser's state must only be touched from its owning
//! strand, implemented there as a message sent into the chaser's own
//! `tokio::task` inbox. This crate does not own that task wiring (that is
//! `bn-node`'s concern); until it exists, these handles give channels the
//! same serialization property by funneling every call through a mutex
//! rather than a mailbox. Swapping this for a real actor inbox later does
//! not change any channel's code, only what's behind the handle.

use bn_check::{CheckChaser, Map};
use bn_organize::{ConsensusChecker, OrganizeChaser, OrganizeResponse};
use bn_store::ChainStore;
use shared_types::entities::{Candidate, Link};
use shared_types::errors::Code;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Serialized access to the organize chaser (C3).
pub struct OrganizeHandle<S, C> {
    inner: Mutex<OrganizeChaser<S, C>>,
}

impl<S, C> OrganizeHandle<S, C>
where
    S: ChainStore,
    C: ConsensusChecker,
{
    #[must_use]
    pub fn new(chaser: OrganizeChaser<S, C>) -> Self {
        Self {
            inner: Mutex::new(chaser),
        }
    }

    /// Runs `organize` for one candidate, as if called from the chaser's
    /// own strand.
    pub async fn organize(&self, candidate: Candidate, now: u64) -> OrganizeResponse {
        self.inner.lock().await.organize(candidate, now).await
    }

    /// Runs `disorganize` for a candidate link rejected by a downstream
    /// chaser (§4.3: "Triggered by `unchecked|unvalid|unconfirmable`
    /// events").
    pub async fn disorganize(&self, link: Link, height: u64) -> Result<(), Code> {
        self.inner.lock().await.disorganize(link, height).await
    }
}

/// Serialized access to the check chaser (C4).
pub struct CheckHandle<S> {
    inner: Mutex<CheckChaser<S>>,
}

impl<S> CheckHandle<S>
where
    S: ChainStore,
{
    #[must_use]
    pub fn new(chaser: CheckChaser<S>) -> Self {
        Self {
            inner: Mutex::new(chaser),
        }
    }

    /// Requests the next download map for `channel_key` (§4.4: work
    /// stealing from the shared queue).
    pub async fn get_hashes(&self, channel_key: u64) -> Option<Map> {
        self.inner.lock().await.get_hashes(channel_key).await
    }

    /// Reports this channel's map was cleared by a `purge`.
    pub async fn on_purge(&self, channel_key: u64) {
        self.inner.lock().await.on_purge(channel_key);
    }

    /// `start | bump | headers`: scans a fresh download window if the gate
    /// is open (§4.4). Exposed here so the bus reactor and the channels
    /// this handle serves share the one chaser instance rather than two
    /// that would silently diverge.
    pub async fn on_window_signal(&self, top: u64, is_current: bool) {
        self.inner.lock().await.on_window_signal(top, is_current).await;
    }

    /// `checked(height)`: advances `position_` past newly associated runs.
    pub async fn on_checked(&self) {
        self.inner.lock().await.on_checked();
    }

    /// `confirmable(height)`: tracks `confirmed_` and re-scans once it has
    /// caught up with `requested_`.
    pub async fn on_confirmable(&self, height: u64, top: u64, is_current: bool) {
        self.inner.lock().await.on_confirmable(height, top, is_current).await;
    }

    /// `regressed | disorganized(branch_point)`: purges outstanding work
    /// below the new branch point.
    pub async fn on_regressed_or_disorganized(&self, branch_point: u64) {
        self.inner.lock().await.on_regressed_or_disorganized(branch_point).await;
    }

    /// `stall`: every channel whose map has more than one element splits.
    pub async fn on_stall(&self) {
        self.inner.lock().await.on_stall().await;
    }

    /// Outstanding maps not yet handed to a channel.
    pub async fn queued_maps(&self) -> usize {
        self.inner.lock().await.queued_maps()
    }
}
