//! # Store Port
//!
//! The single trait every chaser depends on for archive/query access
//! (§4.2). No chaser touches table layout; everything crosses this
//! boundary so tests can substitute [`crate::MemoryStore`] for a real
//! memory-mapped archive.

use crate::domain::progress::ProgressCallback;
use crate::domain::state::{Association, ValidatedForkEntry};
use shared_types::entities::{Block, ChainState, Context, Header, Link};
use shared_types::errors::StoreError;

/// Result alias every store operation returns (§4.2: "failures return an
/// error code, never throw").
pub type StoreResult<T> = Result<T, StoreError>;

/// The store facade port (§4.2).
pub trait ChainStore: Send + Sync {
    /// Creates tables and archives the genesis block (I7).
    fn initialize(&self, genesis: &Block) -> StoreResult<Link>;

    /// Opens the store, reporting per-table progress.
    fn open(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()>;
    /// Closes the store cleanly, setting the flush-lock sentinel.
    fn close(&self) -> StoreResult<()>;
    /// Takes a crash-consistent snapshot of every table.
    fn snapshot(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()>;
    /// Restores from the most recent snapshot.
    fn restore(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()>;
    /// Reloads tables from disk after an externally-triggered invalidation
    /// (e.g. recovering from `disk_full`).
    fn reload(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()>;

    /// Height of the current candidate chain tip.
    fn get_top_candidate(&self) -> u64;
    /// Height of the current confirmed chain tip.
    fn get_top_confirmed(&self) -> u64;
    /// Height of the highest associated (block-downloaded) candidate.
    fn get_top_associated(&self) -> u64;
    /// Greatest height at which candidate and confirmed agree (I1).
    fn get_fork(&self) -> u64;

    /// Scans up to `limit` unassociated candidates above `height`, stopping
    /// at `stop` (§4.4: inventory scanning).
    fn get_unassociated_above(&self, height: u64, limit: usize, stop: u64) -> Vec<Association>;
    /// Total unassociated candidates above the fork point.
    fn get_unassociated_count(&self) -> usize;

    /// Resolves the header-link archived at candidate height `h`.
    fn to_candidate(&self, height: u64) -> Link;
    /// Resolves the header-link archived at confirmed height `h`.
    fn to_confirmed(&self, height: u64) -> Link;
    /// Resolves a link by header hash.
    fn to_header(&self, hash: shared_types::entities::Hash) -> Link;
    /// Resolves a link's parent link.
    fn to_parent(&self, link: Link) -> Link;
    /// Resolves the height a link was archived at, if known (candidate or
    /// confirmed index). Used by the organize chaser's branch-point walk
    /// (§4.3.1) and the validate/confirm chasers' block/context fetch.
    fn height_of(&self, link: Link) -> Option<u64>;
    /// Fetches the archived header for `link`.
    fn get_header(&self, link: Link) -> Option<Header>;
    /// Fetches the archived full block for `link`, if its body has been
    /// associated (§4.5.1: "validate_block fetches the block").
    fn get_block(&self, link: Link) -> Option<Block>;
    /// Fetches the consensus context recorded when `link` was archived.
    fn get_context(&self, link: Link) -> Option<Context>;
    /// Returns true if `link`'s block body has been archived.
    fn is_associated(&self, link: Link) -> bool;
    /// Returns true if `link` is at or under a configured milestone.
    fn is_milestone(&self, link: Link) -> bool;
    /// Returns true if `link`'s height is at or under a hard-coded checkpoint.
    fn is_under_checkpoint(&self, height: u64) -> bool;

    /// Archives a header (or header+block) and its consensus context,
    /// returning the assigned link.
    fn set_link(&self, header: &Header, context: Context) -> Link;
    /// Archives a full block's transactions atomically under an existing
    /// header link; `checked` marks the link strong (checkpoint/milestone
    /// bypass, §4.2).
    fn set_code(&self, link: Link, block: &Block, checked: bool) -> StoreResult<()>;

    /// Returns `link`'s current strong marker, used by the confirm chaser
    /// to remember pre-reorganize strength when rolling back a failed
    /// reorganize attempt (§4.6.1).
    fn is_strong(&self, link: Link) -> bool;
    /// Marks `link` strong (consensus state fully established).
    fn set_strong(&self, link: Link) -> StoreResult<()>;
    /// Clears `link`'s strong marker (reorg/roll-back).
    fn set_unstrong(&self, link: Link) -> StoreResult<()>;

    /// Pushes `link` onto the top of the candidate index.
    fn push_candidate(&self, link: Link) -> StoreResult<()>;
    /// Pops the candidate index's current top, returning its link.
    fn pop_candidate(&self) -> StoreResult<Link>;
    /// Pushes `link` onto the top of the confirmed index; `strong` controls
    /// whether the confirm chaser also marks it strong (§4.6: checkpointed
    /// heights are already strong and must not be double-set).
    fn push_confirmed(&self, link: Link, strong: bool) -> StoreResult<()>;
    /// Pops the confirmed index's current top, returning its link.
    fn pop_confirmed(&self) -> StoreResult<Link>;

    /// Returns `link`'s current block state.
    fn get_block_state(&self, link: Link) -> shared_types::entities::BlockState;
    /// Transitions `link` to `block_valid`, recording collected fees.
    fn set_block_valid(&self, link: Link, fees: u64) -> StoreResult<()>;
    /// Transitions `link` to `block_confirmable`.
    fn set_block_confirmable(&self, link: Link) -> StoreResult<()>;
    /// Transitions `link` to `block_unconfirmable` (I5: only for full-block
    /// identity failures, never for header-only/malleated rejection).
    fn set_block_unconfirmable(&self, link: Link) -> StoreResult<()>;
    /// Runs the confirmability predicate for an already-`block_valid` link
    /// (§4.6: distinct from consensus validity; confirmation-time only).
    fn block_confirmable(&self, link: Link) -> StoreResult<()>;
    /// Updates the stored neutrino filter head for `link`, if enabled.
    fn set_filter_head(&self, link: Link) -> StoreResult<()>;

    /// Returns the contiguous run of decidable candidate states above the
    /// fork point (§4.2, P4), plus the resolved fork point height.
    fn get_validated_fork(&self, checkpoint: bool, filter_enabled: bool)
        -> (u64, Vec<ValidatedForkEntry>);
    /// Reconstructs the consensus context and cumulative work at `height`.
    fn get_candidate_chain_state(&self, height: u64) -> Option<ChainState>;
    /// Cumulative proof-of-work over the candidate branch `(from, to]`.
    fn get_work(&self, from: u64, to: u64) -> u128;

    /// True if the last write to any table reported disk-full.
    fn is_full(&self) -> bool;
    /// True if a fatal fault has been recorded against the store.
    fn is_fault(&self) -> bool;
    /// Returns the recorded fault, if any.
    fn get_fault(&self) -> Option<StoreError>;
    /// Remaining free space, in bytes, across all tables.
    fn get_space(&self) -> u64;
    /// Clears the fault/full flags after operator intervention.
    fn clear_errors(&self);

    /// True once the confirmed tip has caught up with the candidate tip,
    /// i.e. there is no pending speculative branch left to reorganize away
    /// (§4.7: precondition for the snapshot chaser's one-shot prune).
    fn is_coalesced(&self) -> bool;
    /// Compacts the prevout cache. One-shot per node lifetime; the caller
    /// (the snapshot chaser) is responsible for not invoking it twice.
    fn prune(&self) -> StoreResult<()>;
}
