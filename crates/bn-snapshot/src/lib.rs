//! Snapshot chaser (C7): one-shot prevout-cache pruning plus
//! policy-triggered cold/hot store snapshots (§4.7, §4.7.1).

mod chaser;
mod domain;

pub use chaser::SnapshotChaser;
pub use domain::SnapshotSettings;
