//! Consensus validation collaborator (§4.5 step 3, §1: "treated as a pure
//! function dependency"). Populate/accept/connect are kept as one
//! collaborator call rather than reimplemented, mirroring how the organize
//! chaser treats header/block checking as external (§4.3 step 3).

use shared_types::entities::{Block, Context};

/// The two independent populate failure points `validate_block` maps to
/// validate3/validate4 (§4.5.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulateError {
    /// Internal spend-metadata self-population failed.
    SelfPopulate,
    /// External prevout population from the store failed.
    PrevoutPopulate,
}

/// Outcome of `accept`/`connect` once a block is fully populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidateOutcome {
    /// Consensus-valid; carries the block's collected fees.
    Valid {
        /// Total transaction fees collected by this block.
        fees: u64,
    },
    /// Genuine consensus rejection (not a store failure).
    Rejected,
}

/// External collaborator running `populate`/`accept`/`connect` (§4.5 step
/// 3). A real deployment wires in the chain's actual rule engine; tests
/// supply a stub that always succeeds or one scripted to fail at a
/// specific phase.
pub trait BlockValidator: Send + Sync {
    /// Self-populates internal spend metadata, then prevouts from the
    /// store.
    fn populate(&self, block: &Block, context: &Context) -> Result<(), PopulateError>;
    /// Runs `block.accept(context, ...)` then `block.connect(context)`.
    fn accept_connect(&self, block: &Block, context: &Context) -> ValidateOutcome;
}

/// A validator that always succeeds with zero fees. Exercises the
/// checkpoint/milestone/dispatch control flow in isolation from real
/// consensus rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveValidator;

impl BlockValidator for PermissiveValidator {
    fn populate(&self, _block: &Block, _context: &Context) -> Result<(), PopulateError> {
        Ok(())
    }

    fn accept_connect(&self, _block: &Block, _context: &Context) -> ValidateOutcome {
        ValidateOutcome::Valid { fees: 0 }
    }
}
