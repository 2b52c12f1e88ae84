//! Scenario modules, one per spec §8 flow.

mod fixtures;
mod linear_sync;
mod reorg_and_disorganize;
mod snapshot_suspend;
mod window_scan;
