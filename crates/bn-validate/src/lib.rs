//! # Validate Chaser (C5)
//!
//! Dispatches consensus validation across the candidate index with a
//! bounded backlog and a maturity gate (§4.5).

pub mod chaser;
pub mod domain;

pub use chaser::ValidateChaser;
pub use domain::{BlockValidator, PermissiveValidator, PopulateError, ValidateOutcome, ValidateSettings};
