//! The organize chaser (C3): candidate chain maintenance, header tree cache,
//! reorganize, and disorganize (§4.3).

use crate::domain::{
    extend_chain_state, is_storable, CheckOutcome, ConsensusChecker, HeaderTree, OrganizeSettings,
    TreeEntry,
};
use shared_bus::{ChainEvent, Component, EventKind, EventPublisher, EventValue};
use shared_types::entities::{BlockState, Candidate, ChainState, Hash, Link};
use shared_types::errors::{ChannelError, Code, OrganizeFault};
use std::sync::Arc;

/// Outcome of calling [`OrganizeChaser::organize`]: the code every caller
/// must inspect, plus the link assigned if the candidate was archived.
#[derive(Debug, Clone, Copy)]
pub struct OrganizeResponse {
    /// Success, a per-channel error, or a fatal organize fault.
    pub code: Code,
    /// The store link, when the candidate was a duplicate or was archived.
    pub link: Option<Link>,
    /// The height the candidate was (or already is) stored at, when known.
    pub height: Option<u64>,
}

impl OrganizeResponse {
    fn channel(error: ChannelError) -> Self {
        Self {
            code: Code::Channel(error),
            link: None,
            height: None,
        }
    }

    fn fatal(fault: OrganizeFault) -> Self {
        Self {
            code: Code::Organize(fault),
            link: None,
            height: None,
        }
    }

    fn success(link: Option<Link>, height: Option<u64>) -> Self {
        Self {
            code: Code::Success,
            link,
            height,
        }
    }
}

/// Where a candidate's immediate parent was found, and what chain-state it
/// carries forward from there (§4.3.1: "two-phase parent-link traversal").
struct ParentResolution {
    state: ChainState,
    branch_point: u64,
    /// Cached ancestors between `branch_point` (exclusive) and the new
    /// candidate's parent (inclusive), oldest first. Empty when the parent
    /// is already archived on the candidate chain.
    tree_ancestors: Vec<(Hash, TreeEntry)>,
}

/// Owns the header tree cache and runs the organize/disorganize decision
/// procedures on its single strand (§5.1: "no other task touches this
/// state directly"). `S` is the store port; `C` the consensus collaborator.
pub struct OrganizeChaser<S, C> {
    store: Arc<S>,
    bus: Arc<dyn EventPublisher>,
    checker: C,
    settings: OrganizeSettings,
    tree: HeaderTree,
}

impl<S, C> OrganizeChaser<S, C>
where
    S: bn_store::ChainStore,
    C: ConsensusChecker,
{
    /// Builds a chaser with an empty cache tree.
    pub fn new(store: Arc<S>, bus: Arc<dyn EventPublisher>, checker: C, settings: OrganizeSettings) -> Self {
        Self {
            store,
            bus,
            checker,
            settings,
            tree: HeaderTree::new(),
        }
    }

    /// Number of cached (not yet archived) branch entries.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.tree.len()
    }

    fn resolve_parent(&self, parent_hash: Hash) -> Option<ParentResolution> {
        let parent_link = self.store.to_header(parent_hash);
        if !parent_link.is_terminal() {
            let branch_point = self.store.height_of(parent_link)?;
            let state = self.store.get_candidate_chain_state(branch_point)?;
            return Some(ParentResolution {
                state,
                branch_point,
                tree_ancestors: Vec::new(),
            });
        }

        if !self.tree.contains(&parent_hash) {
            return None;
        }
        let tree_ancestors = self.tree.ascending_branch_from(parent_hash);
        let root_parent_hash = tree_ancestors[0].1.candidate.header().previous_hash;
        let root_link = self.store.to_header(root_parent_hash);
        if root_link.is_terminal() {
            return None;
        }
        let branch_point = self.store.height_of(root_link)?;
        let state = tree_ancestors.last().map(|(_, entry)| entry.state)?;
        Some(ParentResolution {
            state,
            branch_point,
            tree_ancestors,
        })
    }

    /// Runs the §4.3 decision procedure for one incoming candidate.
    pub async fn organize(&mut self, candidate: Candidate, now: u64) -> OrganizeResponse {
        let hash = candidate.hash();

        // Step 1: duplicate / orphan detection.
        if let Some(entry) = self.tree.get(&hash) {
            return OrganizeResponse {
                code: Code::Channel(ChannelError::Duplicate),
                link: None,
                height: Some(entry.state.height()),
            };
        }
        let existing = self.store.to_header(hash);
        if !existing.is_terminal() {
            return OrganizeResponse {
                code: Code::Channel(ChannelError::Duplicate),
                link: Some(existing),
                height: self.store.height_of(existing),
            };
        }

        let header = *candidate.header();
        let Some(resolution) = self.resolve_parent(header.previous_hash) else {
            return OrganizeResponse::channel(ChannelError::Orphan);
        };

        // Step 2: chain state extension + checkpoint gate.
        let height = resolution.state.height() + 1;
        if self.settings.is_checkpoint_conflict(hash, height) {
            return OrganizeResponse::channel(ChannelError::CheckpointConflict);
        }
        let child_state = extend_chain_state(&resolution.state, &header, now, &self.settings);

        // Step 3: validity gate. Malleated identities stop the channel and
        // are never cached (I5).
        let outcome = match candidate.block() {
            Some(block) => self.checker.check_block(block, &child_state.context),
            None => self.checker.check_header(&header, &child_state.context),
        };
        match outcome {
            CheckOutcome::Valid => {}
            CheckOutcome::Malleated => {
                return OrganizeResponse::channel(ChannelError::ChannelStopped);
            }
            CheckOutcome::Invalid => {
                return OrganizeResponse::channel(ChannelError::InvalidHeader);
            }
        }

        // Step 4: storability gate.
        if !is_storable(&child_state, &self.settings) {
            self.tree.insert(hash, candidate, child_state);
            return OrganizeResponse::success(None, Some(height));
        }

        // Step 5: work comparison. Cache-branch work above branch_point is
        // the challenger's cumulative work minus the branch point's; the
        // existing candidate side is read straight off the store (§4.3.1:
        // "early-exit... return weak as soon as the accumulated candidate-
        // side work reaches or exceeds the challenger's").
        let Some(branch_state) = self.store.get_candidate_chain_state(resolution.branch_point) else {
            return OrganizeResponse::fatal(OrganizeFault::BranchPointNotFound);
        };
        let challenger_work = child_state
            .cumulative_work
            .saturating_sub(branch_state.cumulative_work);
        let top = self.store.get_top_candidate();
        let candidate_work = self.store.get_work(resolution.branch_point, top);
        if candidate_work >= challenger_work {
            self.tree.insert(hash, candidate, child_state);
            return OrganizeResponse::success(None, Some(height));
        }

        // Step 6: reorganize.
        match self
            .reorganize(resolution.branch_point, top, resolution.tree_ancestors, hash, candidate, child_state)
            .await
        {
            Ok(link) => {
                // Step 7: current-signal.
                if child_state.is_current {
                    self.bus
                        .publish(ChainEvent::new(
                            Component::Organize,
                            EventKind::Bump,
                            EventValue::U64(height),
                            Code::Success,
                        ))
                        .await;
                }
                self.bus
                    .publish(ChainEvent::new(
                        Component::Organize,
                        EventKind::Reorganized,
                        EventValue::U64(height),
                        Code::Success,
                    ))
                    .await;
                OrganizeResponse::success(Some(link), Some(height))
            }
            Err(fault) => OrganizeResponse::fatal(fault),
        }
    }

    async fn reorganize(
        &mut self,
        branch_point: u64,
        top: u64,
        tree_ancestors: Vec<(Hash, TreeEntry)>,
        new_hash: Hash,
        new_candidate: Candidate,
        new_state: ChainState,
    ) -> Result<Link, OrganizeFault> {
        for h in (branch_point + 1..=top).rev() {
            let link = self.store.to_candidate(h);
            if self.settings.is_under_milestone(h)
                || self.store.get_block_state(link) == BlockState::BlockConfirmable
            {
                self.store
                    .set_unstrong(link)
                    .map_err(|_| OrganizeFault::SetUnstrong)?;
            }
            self.store.pop_candidate().map_err(|_| OrganizeFault::CandidatePop)?;
        }
        self.bus
            .publish(ChainEvent::new(
                Component::Organize,
                EventKind::Regressed,
                EventValue::U64(branch_point),
                Code::Success,
            ))
            .await;

        // Move cache-branch entries into the store ascending, then the new
        // candidate itself, archiving each via set_link (+ set_code for
        // full blocks) and pushing onto the candidate index.
        let mut ascending: Vec<(Hash, Candidate, ChainState)> = tree_ancestors
            .into_iter()
            .map(|(hash, entry)| (hash, entry.candidate, entry.state))
            .collect();
        ascending.push((new_hash, new_candidate, new_state));

        let mut final_link = Link::TERMINAL;
        for (hash, candidate, state) in ascending {
            let link = self.store.set_link(candidate.header(), state.context);
            if let Candidate::Full(block) = &candidate {
                self.store
                    .set_code(link, block, false)
                    .map_err(|_| OrganizeFault::BlockArchive)?;
            }
            self.store
                .push_candidate(link)
                .map_err(|_| OrganizeFault::CandidatePush)?;
            if self.settings.is_under_milestone(state.height()) {
                self.store
                    .set_strong(link)
                    .map_err(|_| OrganizeFault::SetUnstrong)?;
            }
            self.tree.remove(&hash);
            final_link = link;
        }
        Ok(final_link)
    }

    /// Triggered by `unchecked|unvalid|unconfirmable` events against a
    /// candidate header-link (§4.3: "Disorganization").
    pub async fn disorganize(&mut self, link: Link, height: u64) -> Result<(), Code> {
        let fork_point = self.store.get_fork();
        if height <= fork_point {
            return Err(Code::Organize(OrganizeFault::DisorganizeBelowFork));
        }

        // Copy candidates from above fork down to height-1 into the cache,
        // forward order so chain-state chaining proceeds ancestor-first.
        for h in (fork_point + 1)..height {
            let l = self.store.to_candidate(h);
            let header = self
                .store
                .get_header(l)
                .ok_or(Code::Organize(OrganizeFault::CacheCopy))?;
            let context = self
                .store
                .get_context(l)
                .ok_or(Code::Organize(OrganizeFault::CacheCopy))?;
            let cumulative_work = self
                .store
                .get_candidate_chain_state(h)
                .ok_or(Code::Organize(OrganizeFault::CacheCopy))?
                .cumulative_work;
            let candidate = match self.store.get_block(l) {
                Some(block) => Candidate::Full(block),
                None => Candidate::HeaderOnly(header),
            };
            let state = ChainState {
                context,
                cumulative_work,
                is_current: true,
            };
            self.tree.insert(header.hash(), candidate, state);
        }

        // Pop candidates from current top down to fork+1 (same unstrong
        // discipline as reorganize).
        let top = self.store.get_top_candidate();
        for h in (fork_point + 1..=top).rev() {
            let l = self.store.to_candidate(h);
            if self.settings.is_under_milestone(h)
                || self.store.get_block_state(l) == BlockState::BlockConfirmable
            {
                self.store
                    .set_unstrong(l)
                    .map_err(|_| Code::Organize(OrganizeFault::SetUnstrong))?;
            }
            self.store
                .pop_candidate()
                .map_err(|_| Code::Organize(OrganizeFault::CandidatePop))?;
        }

        self.bus
            .publish(ChainEvent::new(
                Component::Organize,
                EventKind::Disorganized,
                EventValue::U64(fork_point),
                Code::Success,
            ))
            .await;

        // Push confirmed heights from fork+1 to top_confirmed onto the
        // candidate index.
        let top_confirmed = self.store.get_top_confirmed();
        for h in (fork_point + 1)..=top_confirmed {
            let l = self.store.to_confirmed(h);
            self.store
                .push_candidate(l)
                .map_err(|_| Code::Organize(OrganizeFault::ConfirmedPush))?;
        }

        self.bus
            .publish(ChainEvent::new(
                Component::Organize,
                EventKind::Suspend,
                EventValue::Empty,
                Code::Success,
            ))
            .await;

        Ok(())
    }
}
