//! # Check Chaser (C4)
//!
//! Maintains the download-map queue peer channels pull work from, with
//! work-stealing and stall-driven splitting (§4.4).

pub mod chaser;
pub mod domain;

pub use chaser::{CheckChaser, Map};
pub use domain::{inventory_size, to_half, window_step, CheckSettings};
