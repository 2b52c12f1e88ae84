//! The confirm chaser (C6): promotes the validated candidate branch onto
//! the confirmed chain, with reorganize/roll-back for a losing confirmed
//! branch (§4.6, §4.6.1).

use crate::domain::ConfirmSettings;
use bn_store::ValidatedForkEntry;
use shared_bus::{ChainEvent, Component, EventKind, EventPublisher, EventValue};
use shared_types::entities::{BlockState, Link};
use shared_types::errors::{Code, ConfirmFault};
use std::sync::Arc;

/// A popped confirmed height, remembered so a failed reorganize attempt
/// can restore it in `roll_back` (§4.6.1).
struct Popped {
    link: Link,
    strong: bool,
}

/// Owns the confirmed-chain promotion decision procedure on its single
/// strand (§5.1).
pub struct ConfirmChaser<S> {
    store: Arc<S>,
    bus: Arc<dyn EventPublisher>,
    settings: ConfirmSettings,
    recent: bool,
}

impl<S> ConfirmChaser<S>
where
    S: bn_store::ChainStore,
{
    /// Builds a chaser; `recent_` starts false (§4.6.1: "transitions from
    /// false to true exactly once per sync").
    pub fn new(store: Arc<S>, bus: Arc<dyn EventPublisher>, settings: ConfirmSettings) -> Self {
        Self {
            store,
            bus,
            settings,
            recent: false,
        }
    }

    /// True once the confirmed tip has been judged close to the network
    /// height (§4.6.1).
    #[must_use]
    pub fn is_recent(&self) -> bool {
        self.recent
    }

    fn confirmed_branch_work(&self, from: u64, to: u64) -> u128 {
        let mut work = 0u128;
        for h in (from + 1)..=to {
            let link = self.store.to_confirmed(h);
            if let Some(header) = self.store.get_header(link) {
                work += u128::from(header.bits);
            }
        }
        work
    }

    /// `start | bump | valid(height) | regressed(h) | disorganized(h)`:
    /// runs the full reorganize+organize decision procedure (§4.6).
    pub async fn on_event(&mut self, network_height: u64, is_current: bool) -> Result<(), Code> {
        let (fork_point, entries) = self.store.get_validated_fork(false, self.settings.filter_enabled);
        let top_confirmed = self.store.get_top_confirmed();
        if fork_point > top_confirmed {
            return Err(Code::Confirm(ConfirmFault::ForkAboveConfirmedTop));
        }
        if entries.is_empty() {
            return Ok(());
        }
        let new_top = fork_point + entries.len() as u64;
        if new_top <= top_confirmed {
            return Ok(());
        }

        let challenger_work = self.store.get_work(fork_point, new_top);
        let confirmed_work = self.confirmed_branch_work(fork_point, top_confirmed);
        if challenger_work <= confirmed_work {
            return Ok(());
        }

        let mut popped = Vec::new();
        for h in (fork_point + 1..=top_confirmed).rev() {
            let link = self.store.to_confirmed(h);
            if link.is_terminal() {
                return Err(Code::Confirm(ConfirmFault::TerminalLinkDuringPop));
            }
            let strong = self.store.is_strong(link);
            self.store
                .pop_confirmed()
                .map_err(|_| Code::Confirm(ConfirmFault::SetReorganized))?;
            popped.push(Popped { link, strong });
        }

        let mut advanced = 0u64;
        for entry in entries {
            match self.confirm_block(entry).await? {
                ConfirmOutcome::Confirmed => {
                    advanced += 1;
                    self.bus
                        .publish(ChainEvent::new(
                            Component::Confirm,
                            EventKind::Organized,
                            EventValue::U64(entry.height),
                            Code::Success,
                        ))
                        .await;
                    if is_current {
                        self.bus
                            .publish(ChainEvent::new(
                                Component::Confirm,
                                EventKind::Block,
                                EventValue::U64(entry.height),
                                Code::Success,
                            ))
                            .await;
                    }
                    self.maybe_transition_recent(entry.height, network_height).await;
                }
                ConfirmOutcome::NeedsRollback => {
                    self.roll_back(&popped)
                        .await
                        .map_err(|_| Code::Confirm(ConfirmFault::RollBack))?;
                    return Ok(());
                }
            }
        }
        let _ = advanced;

        // Completion signal: continue immediately rather than waiting for
        // the next externally-published bump (§4.6: "post an internal
        // bump"). Callers drive this by calling `on_event` again from the
        // owning task loop when this returns `Ok`.
        Ok(())
    }

    async fn confirm_block(&mut self, entry: ValidatedForkEntry) -> Result<ConfirmOutcome, Code> {
        match entry.state {
            BlockState::Bypassed => {
                self.store
                    .set_filter_head(entry.link)
                    .map_err(|_| Code::Confirm(ConfirmFault::FilterHeadBypassed))?;
            }
            BlockState::BlockValid => {
                if self.store.block_confirmable(entry.link).is_err() {
                    self.store
                        .set_unstrong(entry.link)
                        .map_err(|_| Code::Confirm(ConfirmFault::SetUnstrong))?;
                    self.store
                        .set_block_unconfirmable(entry.link)
                        .map_err(|_| Code::Confirm(ConfirmFault::SetBlockUnconfirmable))?;
                    return Ok(ConfirmOutcome::NeedsRollback);
                }
                self.store
                    .set_filter_head(entry.link)
                    .map_err(|_| Code::Confirm(ConfirmFault::FilterHeadConfirmed))?;
                self.store
                    .set_block_confirmable(entry.link)
                    .map_err(|_| Code::Confirm(ConfirmFault::SetBlockConfirmable))?;
            }
            BlockState::BlockConfirmable => {
                self.store
                    .set_filter_head(entry.link)
                    .map_err(|_| Code::Confirm(ConfirmFault::FilterHeadConfirmed))?;
            }
            _ => return Err(Code::Confirm(ConfirmFault::ForkEntryNotDecidable)),
        }

        let strong = !self.store.is_under_checkpoint(entry.height);
        self.store
            .push_confirmed(entry.link, strong)
            .map_err(|_| Code::Confirm(ConfirmFault::SetOrganized))?;
        Ok(ConfirmOutcome::Confirmed)
    }

    async fn roll_back(&mut self, popped: &[Popped]) -> Result<(), ()> {
        for p in popped.iter().rev() {
            self.store.push_confirmed(p.link, p.strong).map_err(|_| ())?;
        }
        Ok(())
    }

    async fn maybe_transition_recent(&mut self, confirmed_height: u64, network_height: u64) {
        let within_threshold = network_height.saturating_sub(confirmed_height) <= self.settings.recent_threshold;
        let became_recent = !self.recent && within_threshold;
        if became_recent {
            self.recent = true;
        }
        if became_recent || self.recent {
            self.bus
                .publish(ChainEvent::new(
                    Component::Confirm,
                    EventKind::Snap,
                    EventValue::U64(confirmed_height),
                    Code::Success,
                ))
                .await;
        }
    }
}

enum ConfirmOutcome {
    Confirmed,
    NeedsRollback,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bn_store::{ChainStore, MemoryStore};
    use shared_bus::InMemoryEventBus;
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

    fn archive_valid(store: &MemoryStore, parent: shared_types::entities::Hash, nonce: u32, height: u64) -> Link {
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
        let block = Block { header, transactions: vec![] };
        store.set_code(link, &block, false).expect("set_code");
        store.push_candidate(link).expect("push");
        store.set_block_valid(link, 0).expect("set_block_valid");
        link
    }

    fn chaser(store: Arc<MemoryStore>) -> ConfirmChaser<MemoryStore> {
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        ConfirmChaser::new(store, bus, ConfirmSettings::default())
    }

    #[tokio::test]
    async fn confirms_a_valid_candidate_fork() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let link = archive_valid(&store, genesis().hash(), 1, 1);
        let mut c = chaser(store.clone());

        c.on_event(1, true).await.expect("on_event");
        assert_eq!(store.get_top_confirmed(), 1);
        assert_eq!(store.get_block_state(link), BlockState::BlockConfirmable);
    }

    #[tokio::test]
    async fn empty_fork_is_a_no_op() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        let mut c = chaser(store.clone());
        c.on_event(0, true).await.expect("on_event");
        assert_eq!(store.get_top_confirmed(), 0);
    }

    #[tokio::test]
    async fn recent_transitions_once_within_threshold() {
        let store = Arc::new(MemoryStore::new(vec![], None));
        store.initialize(&genesis()).expect("initialize");
        archive_valid(&store, genesis().hash(), 1, 1);
        let bus: Arc<dyn EventPublisher> = Arc::new(InMemoryEventBus::new());
        let mut settings = ConfirmSettings::default();
        settings.recent_threshold = 2;
        let mut c = ConfirmChaser::new(store, bus, settings);
        assert!(!c.is_recent());
        c.on_event(1, true).await.expect("on_event");
        assert!(c.is_recent());
    }
}
