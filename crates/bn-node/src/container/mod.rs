//! Wiring-only types: serialized chaser handles and their bus-driven
//! reactor tasks (§5.1). Nothing here holds chain-state logic; it is all
//! in the chaser crates this module wires together.

pub mod handles;
pub mod reactors;
