//! # Cross-Chaser Integration Tests
//!
//! Exercises the organize/check/validate/confirm pipeline end to end
//! against the in-memory reference store, without any particular
//! component's internals — the scenarios from spec §8.

#[cfg(test)]
mod integration;
