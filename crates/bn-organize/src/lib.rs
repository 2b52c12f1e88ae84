//! # Organize Chaser (C3)
//!
//! Owns the header tree cache and the candidate chain's reorganize and
//! disorganize decision procedures (§4.3). No other component touches the
//! cache tree or calls `push_candidate`/`pop_candidate` directly.

pub mod chaser;
pub mod domain;

pub use chaser::{OrganizeChaser, OrganizeResponse};
pub use domain::{
    extend_chain_state, is_current, is_storable, CheckOutcome, Checkpoint, ConsensusChecker,
    HeaderTree, Milestone, OrganizeSettings, PermissiveChecker, TreeEntry,
};
