//! Confirm chaser (C6): promotes the validated candidate branch onto the
//! confirmed chain, with reorganize/roll-back for a losing confirmed
//! branch (§4.6, §4.6.1).

mod chaser;
mod domain;

pub use chaser::ConfirmChaser;
pub use domain::ConfirmSettings;
