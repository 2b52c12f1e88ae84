pub mod chain_state;
pub mod checker;
pub mod tree;

pub use chain_state::{is_current, is_storable, extend_chain_state, Checkpoint, Milestone, OrganizeSettings};
pub use checker::{CheckOutcome, ConsensusChecker, PermissiveChecker};
pub use tree::{HeaderTree, TreeEntry};
