//! Cross-chaser suspend/resume coordination (§4.7.1, §4.8).
//!
//! Peer channels stop issuing new requests whenever *anything* suspends
//! the node — a fatal fault, a snapshot's `wait_lock`, an operator's
//! control-menu command. Several independent sources can suspend and
//! resume concurrently, so the flag a `resume()` caller checks is shared,
//! not owned by any one chaser.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shared "is the node currently suspended" flag.
///
/// Readers use [`SuspendState::is_suspended`] to decide whether their own
/// operation's resume would be safe; the snapshot chaser's resume
/// discipline (§4.7.1: "never resumes a node that something else
/// deliberately suspended") is exactly "capture `is_suspended()` before
/// the operation, only clear it if it was false beforehand".
#[derive(Clone, Default)]
pub struct SuspendState(Arc<AtomicBool>);

impl SuspendState {
    /// Creates a flag in the running (not suspended) state.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Returns true if the node is currently suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Marks the node suspended.
    pub fn suspend(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clears the suspended flag.
    pub fn resume(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        let s = SuspendState::new();
        assert!(!s.is_suspended());
    }

    #[test]
    fn suspend_then_resume_round_trips() {
        let s = SuspendState::new();
        s.suspend();
        assert!(s.is_suspended());
        s.resume();
        assert!(!s.is_suspended());
    }

    #[test]
    fn clones_share_the_same_flag() {
        let s = SuspendState::new();
        let clone = s.clone();
        clone.suspend();
        assert!(s.is_suspended());
    }
}
