//! Chain-state extension, the currency gate, and the three independent
//! storability gates (§4.3 steps 2 and 4; §9 "Checkpoints vs. milestone vs.
//! minimum_work").

use shared_types::entities::{ChainState, Context, Header};

/// A hard-coded `(height, hash)` pair enforced as chain identity (glossary:
/// "Checkpoint"). Gates both storage and strong-marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub height: u64,
    pub hash: shared_types::entities::Hash,
}

/// An operator-configured `(height, hash)` above which validation may be
/// bypassed to accelerate sync (glossary: "Milestone"). Gates storage but
/// not strong-marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Milestone {
    pub height: u64,
    pub hash: shared_types::entities::Hash,
}

/// The subset of `bitcoin`/`node` configuration (§6) the organize chaser's
/// decision procedure consults directly.
#[derive(Debug, Clone, Default)]
pub struct OrganizeSettings {
    pub checkpoints: Vec<Checkpoint>,
    pub milestone: Option<Milestone>,
    pub minimum_work: u128,
    /// Zero disables the gate entirely (§4.3.1: "mirrors the donor's
    /// explicit `use_currency_window_` toggle").
    pub currency_window_minutes: u64,
}

impl OrganizeSettings {
    /// Returns the checkpoint at `height`, if one is configured there.
    #[must_use]
    pub fn checkpoint_at(&self, height: u64) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.height == height)
    }

    /// §4.3 step 2: "if `checkpoint::is_conflict(checkpoints, hash, height)`
    /// then fail with `checkpoint_conflict`" — true when a checkpoint is
    /// configured at `height` and `hash` disagrees with it.
    #[must_use]
    pub fn is_checkpoint_conflict(&self, hash: shared_types::entities::Hash, height: u64) -> bool {
        self.checkpoint_at(height).is_some_and(|c| c.hash != hash)
    }

    /// True when `height` is at or under the configured milestone.
    #[must_use]
    pub fn is_under_milestone(&self, height: u64) -> bool {
        self.milestone.is_some_and(|m| height <= m.height)
    }

    /// True when `height` is at or under any configured checkpoint.
    #[must_use]
    pub fn is_under_checkpoint(&self, height: u64) -> bool {
        self.checkpoints.iter().any(|c| height <= c.height)
    }
}

/// §4.3.1: "a header is current when its timestamp is no older than
/// `now - currency_window`"; a zero window disables the gate (every header
/// is current).
#[must_use]
pub fn is_current(header_time: u32, now: u64, currency_window_minutes: u64) -> bool {
    if currency_window_minutes == 0 {
        return true;
    }
    let window_secs = currency_window_minutes.saturating_mul(60);
    let header_time = u64::from(header_time);
    now.saturating_sub(header_time) <= window_secs
}

/// §4.3 step 2: derives the child chain-state from the parent's, applying
/// settings and the header. The consensus-flag derivation itself (BIP
/// activation heights, difficulty retarget) is outside the core's scope
/// (§1: "consensus predicates... treated as a pure function"); this
/// extension only carries forward height, MTP, and cumulative work.
#[must_use]
pub fn extend_chain_state(
    parent: &ChainState,
    header: &Header,
    now: u64,
    settings: &OrganizeSettings,
) -> ChainState {
    let height = parent.context.height + 1;
    // Median-time-past is approximated here by the running max of the
    // parent's MTP and the new header's timestamp; real MTP is a median of
    // the last 11 timestamps, which is a property of the consensus
    // predicate this core treats as an external collaborator (§1).
    let median_time_past = parent.context.median_time_past.max(u64::from(header.time));
    let context = Context {
        flags: parent.context.flags,
        height,
        median_time_past,
    };
    ChainState {
        context,
        cumulative_work: parent.cumulative_work + u128::from(header.bits),
        is_current: is_current(header.time, now, settings.currency_window_minutes),
    }
}

/// §4.3 step 4: "A branch is stored only if it is checkpointed, past a
/// configured milestone, or is both current... and accumulated
/// `minimum_work`." Three independent gates (§9), never collapsed.
#[must_use]
pub fn is_storable(state: &ChainState, settings: &OrganizeSettings) -> bool {
    settings.is_under_checkpoint(state.height())
        || settings.is_under_milestone(state.height())
        || (state.is_current && state.cumulative_work >= settings.minimum_work)
}
