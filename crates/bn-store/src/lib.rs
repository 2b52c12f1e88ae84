//! # Store Facade (C2)
//!
//! The archive the organize/check/validate/confirm chasers share: headers,
//! blocks, candidate/confirmed indices, block state, and snapshot/restore.
//! Chasers never touch table layout directly — everything goes through the
//! [`ChainStore`] port (§4.2).

pub mod domain;
pub mod ports;

pub mod adapters {
    pub mod memory;
}

pub use adapters::memory::MemoryStore;
pub use domain::progress::{StoreEvent, StoreTable};
pub use domain::state::{Association, ValidatedForkEntry};
pub use ports::ChainStore;
