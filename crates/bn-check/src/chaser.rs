//! The check chaser (C4): a queue of download maps handed to peer channels
//! on request, with work-stealing and stall-driven splitting (§4.4).

use crate::domain::{inventory_size, to_half, window_step, CheckSettings};
use shared_bus::{ChainEvent, Component, EventKind, EventPublisher, EventValue};
use shared_types::entities::DownloadItem;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// An ordered set of `(hash, height, link)` tuples handed to one channel.
pub type Map = Vec<DownloadItem>;

/// Owns the download-map queue and the per-channel assignment table on its
/// single strand (§5.1).
pub struct CheckChaser<S> {
    store: Arc<S>,
    bus: Arc<dyn EventPublisher>,
    settings: CheckSettings,
    peer_count: usize,
    requested: u64,
    position: u64,
    confirmed: u64,
    queue: VecDeque<Map>,
    assigned: HashMap<u64, Map>,
}

impl<S> CheckChaser<S>
where
    S: bn_store::ChainStore,
{
    /// Builds a chaser with an empty queue, `requested_`/`position_`/
    /// `confirmed_` all at the fork point.
    pub fn new(store: Arc<S>, bus: Arc<dyn EventPublisher>, settings: CheckSettings) -> Self {
        let fork = store.get_fork();
        Self {
            store,
            bus,
            settings,
            peer_count: 0,
            requested: fork,
            position: fork,
            confirmed: fork,
            queue: VecDeque::new(),
            assigned: HashMap::new(),
        }
    }

    /// Updates the known peer count (channels connecting/disconnecting).
    pub fn set_peer_count(&mut self, peer_count: usize) {
        self.peer_count = peer_count;
    }

    /// Outstanding maps not yet handed to a channel.
    #[must_use]
    pub fn queued_maps(&self) -> usize {
        self.queue.len()
    }

    /// `start | bump | headers`: scans a fresh window if the gate is open.
    pub async fn on_window_signal(&mut self, top: u64, is_current: bool) {
        self.maybe_scan_window(top, is_current).await;
    }

    async fn maybe_scan_window(&mut self, top: u64, is_current: bool) {
        if self.position < self.requested || self.confirmed < self.requested {
            return;
        }
        let step = window_step(self.settings.maximum_concurrency, self.settings.maximum_inventory, self.peer_count);
        if step == 0 {
            return;
        }
        let stop = (top + self.settings.maximum_concurrency as u64).min(self.settings.maximum_height);
        let batch = self.store.get_unassociated_above(self.requested, step, stop);
        if batch.is_empty() {
            return;
        }
        let count = inventory_size(batch.len(), self.peer_count, is_current);
        if count == 0 {
            return;
        }
        self.requested = batch.last().map_or(self.requested, |a| a.height);
        let map: Map = batch
            .into_iter()
            .map(|a| DownloadItem {
                hash: self.store.get_header(a.link).map_or([0u8; 32], |h| h.hash()),
                height: a.height,
                link: a.link,
            })
            .collect();
        let len = map.len();
        self.queue.push_back(map);
        self.bus
            .publish(ChainEvent::new(
                Component::Check,
                EventKind::Download,
                EventValue::Size(len),
                shared_types::errors::Code::Success,
            ))
            .await;
    }

    /// `checked(height)`: advances `position_` past any newly associated
    /// contiguous heights.
    pub fn on_checked(&mut self) {
        loop {
            let next = self.position + 1;
            let link = self.store.to_candidate(next);
            if link.is_terminal() || !self.store.is_associated(link) {
                break;
            }
            self.position = next;
        }
    }

    /// `confirmable(height)`: tracks `confirmed_`; re-scans when it has
    /// caught all the way up to `requested_`.
    pub async fn on_confirmable(&mut self, height: u64, top: u64, is_current: bool) {
        self.confirmed = height;
        if self.confirmed == self.requested {
            self.maybe_scan_window(top, is_current).await;
        }
    }

    /// `regressed | disorganized(branch_point)`: purges outstanding work
    /// below the new branch point.
    pub async fn on_regressed_or_disorganized(&mut self, branch_point: u64) {
        if branch_point < self.position {
            self.position = branch_point;
            self.queue.clear();
            self.assigned.clear();
            self.bus
                .publish(ChainEvent::new(
                    Component::Check,
                    EventKind::Purge,
                    EventValue::U64(branch_point),
                    shared_types::errors::Code::Success,
                ))
                .await;
        }
    }

    /// `get_hashes`: hands the next queued map to an idle channel, or
    /// publishes `starved` if the queue is empty.
    pub async fn get_hashes(&mut self, channel_key: u64) -> Option<Map> {
        match self.queue.pop_front() {
            Some(map) => {
                self.assigned.insert(channel_key, map.clone());
                Some(map)
            }
            None => {
                self.bus
                    .notify_one(ChainEvent::keyed(
                        Component::Check,
                        EventKind::Starved,
                        EventValue::Empty,
                        shared_types::errors::Code::Success,
                        channel_key,
                    ))
                    .await;
                None
            }
        }
    }

    /// `stall`: every channel whose map has more than one element splits;
    /// the front half (§4.4.1: "not an arbitrary partition") stays with the
    /// channel, the back half returns to the queue for redistribution.
    pub async fn on_stall(&mut self) {
        let splitting: Vec<u64> = self
            .assigned
            .iter()
            .filter(|(_, map)| map.len() > 1)
            .map(|(key, _)| *key)
            .collect();
        for key in splitting {
            let Some(map) = self.assigned.get_mut(&key) else {
                continue;
            };
            let front_len = to_half(map.len());
            let back = map.split_off(front_len);
            self.queue.push_front(back);
            self.bus
                .notify_one(ChainEvent::keyed(
                    Component::Check,
                    EventKind::Split,
                    EventValue::Empty,
                    shared_types::errors::Code::Success,
                    key,
                ))
                .await;
        }
    }

    /// `purge`: a channel clears its assigned map and stops.
    pub fn on_purge(&mut self, channel_key: u64) {
        self.assigned.remove(&channel_key);
    }
}
