//! # Error Code Taxonomy
//!
//! Every chaser method returns a `Code` instead of throwing (§7:
//! "Propagation policy"). Handlers convert codes to events; fatal codes are
//! funneled through the idempotent `fault()` gate. This module draws the
//! boundary between the four error classes the design calls for:
//!
//! - [`ChannelError`] — per-channel, recoverable, never touches chain state
//! - [`ValidationError`] — globally recoverable, triggers disorganize/reorg
//! - [`StoreError`] — store-layer faults, some fatal
//! - [`Code::Fatal`] — aborts chain progression, funnels through `fault()`

use thiserror::Error;

/// Per-channel protocol errors. Closing the offending channel is sufficient
/// recovery; no chain state changes as a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// A peer sent a block that was not requested.
    #[error("unrequested block")]
    Unrequested,
    /// A duplicate candidate was already seen on this channel.
    #[error("duplicate candidate")]
    Duplicate,
    /// A candidate's parent could not be found (cache or store).
    #[error("orphan candidate")]
    Orphan,
    /// A candidate at a checkpointed height disagrees with the checkpoint.
    #[error("checkpoint conflict")]
    CheckpointConflict,
    /// Header-level consensus check failed.
    #[error("invalid header")]
    InvalidHeader,
    /// Candidate branch does not meet `minimum_work`.
    #[error("insufficient work")]
    InsufficientWork,
    /// Channel was asked to split its download map and stop.
    #[error("sacrificed channel")]
    SacrificedChannel,
    /// Channel-level shutdown in progress (purge/stop).
    #[error("channel stopped")]
    ChannelStopped,
}

/// Validation failures that are recoverable at the chain-state level:
/// a block fails consensus and the affected branch must be disorganized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `block.accept`/`block.connect` rejected the block (I5: never set
    /// for identity-malleated blocks — those stop the channel instead).
    #[error("block unconfirmable")]
    BlockUnconfirmable,
}

/// Store-layer faults. Some are per-operation recoverable, others (flagged
/// by [`StoreError::is_fatal`]) suspend the network and refuse new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A table's on-disk structure failed an integrity check.
    #[error("store integrity violation")]
    Integrity,
    /// Flush-lock sentinel absent on open: prior shutdown was a crash.
    #[error("flush lock absent, unclean shutdown")]
    FlushLock,
    /// Disk space below the configured minimum.
    #[error("disk full")]
    DiskFull,
    /// Underlying table I/O failed.
    #[error("store io error: {0}")]
    Io(String),
}

impl StoreError {
    /// Integrity and disk faults suspend the network (§7: "Store").
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, StoreError::Integrity | StoreError::DiskFull)
    }
}

/// Fatal organize-chaser codes (§7: "organize1..15"). Each corresponds to
/// one step of the organize decision procedure (§4.3) failing in a way
/// that leaves chain state in a condition the chaser cannot repair itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OrganizeFault {
    /// organize1: store query for top candidate failed.
    #[error("organize1: top candidate query failed")]
    TopCandidateQuery,
    /// organize2: store query for fork point failed.
    #[error("organize2: fork point query failed")]
    ForkPointQuery,
    /// organize3: chain state extension failed.
    #[error("organize3: chain state extension failed")]
    ChainStateExtension,
    /// organize4: header archive write failed.
    #[error("organize4: header archive failed")]
    HeaderArchive,
    /// organize5: block archive write failed.
    #[error("organize5: block archive failed")]
    BlockArchive,
    /// organize6: branch-point walk exceeded the cache tree depth.
    #[error("organize6: branch point not found")]
    BranchPointNotFound,
    /// organize7: candidate pop during reorg failed.
    #[error("organize7: candidate pop failed")]
    CandidatePop,
    /// organize8: candidate push during reorg failed.
    #[error("organize8: candidate push failed")]
    CandidatePush,
    /// organize9: set_unstrong during reorg failed.
    #[error("organize9: set_unstrong failed")]
    SetUnstrong,
    /// organize10: event publish for regressed failed.
    #[error("organize10: regressed publish failed")]
    RegressedPublish,
    /// organize11: disorganize height not above fork point.
    #[error("organize11: disorganize below fork point")]
    DisorganizeBelowFork,
    /// organize12: cache copy during disorganize failed.
    #[error("organize12: cache copy failed")]
    CacheCopy,
    /// organize13: confirmed-to-candidate push during disorganize failed.
    #[error("organize13: confirmed push failed")]
    ConfirmedPush,
    /// organize14: suspend publish during disorganize failed.
    #[error("organize14: suspend publish failed")]
    SuspendPublish,
    /// organize15: current-signal publish failed.
    #[error("organize15: current signal publish failed")]
    CurrentSignalPublish,
}

/// Fatal confirm-chaser codes (§7: "confirm1..13"), one per point in
/// `reorganize`/`organize`/`confirm_block`/`roll_back` where the chaser
/// cannot repair its own state and must suspend the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfirmFault {
    /// confirm1: fork point is above the confirmed top (state corruption).
    #[error("confirm1: fork point above confirmed top")]
    ForkAboveConfirmedTop,
    /// confirm2: cumulative-work query for the candidate fork failed.
    #[error("confirm2: work query failed")]
    WorkQuery,
    /// confirm3: strong-fork query during reorganize failed.
    #[error("confirm3: strong fork query failed")]
    StrongForkQuery,
    /// confirm4: popped a terminal link while walking down to the fork point.
    #[error("confirm4: terminal link encountered during pop")]
    TerminalLinkDuringPop,
    /// confirm5: `set_reorganized` failed while popping confirmed heights.
    #[error("confirm5: set_reorganized failed")]
    SetReorganized,
    /// confirm6: filter-head update failed on the `bypassed` confirm path.
    #[error("confirm6: set_filter_head failed (bypassed)")]
    FilterHeadBypassed,
    /// confirm7: a fork entry's block state was unknown, unassociated, or
    /// already `block_unconfirmable` when `organize` expected a decidable
    /// state.
    #[error("confirm7: fork entry not decidable")]
    ForkEntryNotDecidable,
    /// confirm8: `set_organized` failed while pushing a confirmed link.
    #[error("confirm8: set_organized failed")]
    SetOrganized,
    /// confirm9: `set_unstrong` failed inside `confirm_block`'s failure path.
    #[error("confirm9: set_unstrong failed")]
    SetUnstrong,
    /// confirm10: `set_block_unconfirmable` failed inside `confirm_block`.
    #[error("confirm10: set_block_unconfirmable failed")]
    SetBlockUnconfirmable,
    /// confirm11: `roll_back` itself failed while restoring popped heights.
    #[error("confirm11: roll back failed")]
    RollBack,
    /// confirm12: filter-head update failed on the successful confirm path.
    #[error("confirm12: set_filter_head failed (confirmed)")]
    FilterHeadConfirmed,
    /// confirm13: `set_block_confirmable` failed inside `confirm_block`.
    #[error("confirm13: set_block_confirmable failed")]
    SetBlockConfirmable,
}

/// Fatal validate-chaser codes (§7: "validate1..7"), assigned in the order
/// `validate_block`'s fetch/populate/accept/connect pipeline can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidateFault {
    /// validate1: the candidate's block body could not be fetched.
    #[error("validate1: block fetch failed")]
    BlockFetch,
    /// validate2: the candidate's chain context could not be fetched.
    #[error("validate2: context fetch failed")]
    ContextFetch,
    /// validate3: self-population (internal spends, locktime metadata) failed.
    #[error("validate3: block self-population failed")]
    SelfPopulate,
    /// validate4: prevout population from the store failed.
    #[error("validate4: prevout population failed")]
    PrevoutPopulate,
    /// validate5: `set_block_unconfirmable` failed after a failed accept/connect.
    #[error("validate5: set_block_unconfirmable failed")]
    SetBlockUnconfirmable,
    /// validate6: `set_block_valid` failed after a successful accept/connect.
    #[error("validate6: set_block_valid failed")]
    SetBlockValid,
    /// validate7: backlog accounting underflowed or overflowed.
    #[error("validate7: backlog accounting error")]
    BacklogAccounting,
}

/// The union of every fault class a chaser can surface, funneled through
/// the node's single `fault()` gate. Fatal variants suspend the network
/// and leave the node answering queries but refusing new work (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Code {
    /// Per-channel protocol error; closes one channel only.
    #[error(transparent)]
    Channel(#[from] ChannelError),
    /// Chain-state-scoped validation failure; triggers disorganize.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Store-layer fault; may or may not be fatal (see `is_fatal`).
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Fatal organize-chaser fault.
    #[error(transparent)]
    Organize(#[from] OrganizeFault),
    /// Fatal confirm-chaser fault.
    #[error(transparent)]
    Confirm(#[from] ConfirmFault),
    /// Fatal validate-chaser fault.
    #[error(transparent)]
    Validate(#[from] ValidateFault),
    /// No error; the operation succeeded (mirrors `error_code::success` in
    /// the source system so chasers can treat every return uniformly).
    #[error("success")]
    Success,
}

impl Code {
    /// Returns true if this code requires funneling through `fault()`:
    /// network suspension, refusing new work, continuing to serve queries.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        match self {
            Code::Organize(_) | Code::Confirm(_) | Code::Validate(_) => true,
            Code::Store(e) => e.is_fatal(),
            _ => false,
        }
    }

    /// Returns true if only the originating channel needs to close.
    #[must_use]
    pub fn is_channel_scoped(self) -> bool {
        matches!(self, Code::Channel(_))
    }

    /// Returns true if the operation completed without error.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Code::Success)
    }
}

/// Node-wide operational state, reflecting whether the core is accepting
/// new chain-extending work (§7: "Fatal" codes leave queries answerable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Normal operation: all chasers and channels active.
    Running,
    /// Catching up from peers; headers-first sync in progress.
    Syncing,
    /// A fatal fault suspended the network; queries still served.
    HaltedAwaitingIntervention,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_errors_are_never_fatal() {
        let code: Code = ChannelError::Orphan.into();
        assert!(!code.is_fatal());
        assert!(code.is_channel_scoped());
    }

    #[test]
    fn validation_error_is_not_fatal_but_not_channel_scoped() {
        let code: Code = ValidationError::BlockUnconfirmable.into();
        assert!(!code.is_fatal());
        assert!(!code.is_channel_scoped());
    }

    #[test]
    fn store_disk_full_and_integrity_are_fatal_but_io_is_not() {
        assert!(StoreError::DiskFull.is_fatal());
        assert!(StoreError::Integrity.is_fatal());
        assert!(!StoreError::FlushLock.is_fatal());
        assert!(!StoreError::Io("disk read error".into()).is_fatal());
    }

    #[test]
    fn organize_confirm_validate_faults_are_always_fatal() {
        assert!(Code::from(OrganizeFault::BranchPointNotFound).is_fatal());
        assert!(Code::from(ConfirmFault::ForkEntryNotDecidable).is_fatal());
        assert!(Code::from(ValidateFault::BacklogAccounting).is_fatal());
    }

    #[test]
    fn success_is_neither_fatal_nor_channel_scoped() {
        assert!(Code::Success.is_success());
        assert!(!Code::Success.is_fatal());
        assert!(!Code::Success.is_channel_scoped());
    }
}
