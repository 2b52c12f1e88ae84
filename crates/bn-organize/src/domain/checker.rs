//! Consensus check collaborator (§4.3 step 3, §1: "consensus predicates
//! are treated as a pure function dependency, not reimplemented here").

use shared_types::entities::{Block, Context, Header};

/// Outcome of running a candidate through the consensus checker. Malleated
/// identities are distinguished from genuine consensus failures because
/// they gate differently (§4.3 step 3, I5): a malleated block must never
/// produce a `block_unconfirmable` verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The header (and block, if present) passed every consensus check.
    Valid,
    /// Transaction-commitment or witness-commitment mismatch: the
    /// candidate's claimed identity does not match its content.
    Malleated,
    /// A genuine consensus rule violation.
    Invalid,
}

/// External collaborator running header/block consensus predicates. A real
/// deployment supplies the chain's actual rule set; tests supply a stub
/// that always returns `Valid` or one scripted to fail at a specific point.
pub trait ConsensusChecker: Send + Sync {
    /// Runs header-only checks (difficulty target, timestamp bounds).
    fn check_header(&self, header: &Header, context: &Context) -> CheckOutcome;
    /// Runs full-block checks (merkle root, tx/witness commitments, script
    /// verification) in addition to the header checks.
    fn check_block(&self, block: &Block, context: &Context) -> CheckOutcome;
}

/// A checker that accepts everything. Useful for tests exercising the
/// organize decision procedure's storability/reorg logic in isolation from
/// consensus rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveChecker;

impl ConsensusChecker for PermissiveChecker {
    fn check_header(&self, _header: &Header, _context: &Context) -> CheckOutcome {
        CheckOutcome::Valid
    }

    fn check_block(&self, _block: &Block, _context: &Context) -> CheckOutcome {
        CheckOutcome::Valid
    }
}
