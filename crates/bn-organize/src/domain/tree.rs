//! Header tree cache (§9: "Header tree cycles").
//!
//! Weak branches — not yet checkpointed, past milestone, or current with
//! `minimum_work` — live here as a forest keyed by hash, not in the store.
//! Modeled as an indexed arena: slots never move once allocated, parent
//! references are plain hash lookups (never owning), so the forest can
//! have cycles of *candidate* shape without Rust ownership fighting us.

use shared_types::entities::{Candidate, ChainState, Hash};
use std::collections::HashMap;

/// One cached branch entry: the header/block plus the chain-state computed
/// for it when it was first cached (I6: cache entries carry no store link).
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub candidate: Candidate,
    pub state: ChainState,
}

/// The in-memory forest of cached headers/blocks not yet promoted to the
/// store (glossary: "Tree"). Owned exclusively by the organize chaser
/// (§5: "The cache tree is owned by C3 and never touched by others").
#[derive(Debug, Default)]
pub struct HeaderTree {
    by_hash: HashMap<Hash, TreeEntry>,
}

impl HeaderTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `hash` is cached (not yet archived).
    #[must_use]
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Looks up a cached entry by hash.
    #[must_use]
    pub fn get(&self, hash: &Hash) -> Option<&TreeEntry> {
        self.by_hash.get(hash)
    }

    /// Caches a candidate keyed by its header hash.
    pub fn insert(&mut self, hash: Hash, candidate: Candidate, state: ChainState) {
        self.by_hash.insert(hash, TreeEntry { candidate, state });
    }

    /// Removes and returns a cached entry, if present.
    pub fn remove(&mut self, hash: &Hash) -> Option<TreeEntry> {
        self.by_hash.remove(hash)
    }

    /// Walks parent links (by `previous_hash`) from `tip_hash` up to the
    /// first hash not present in the tree, returning the chain of cached
    /// entries in ascending (oldest-first) order — the shape `organize`'s
    /// step 6 needs to drain cache-branch entries into the store (§4.3:
    /// "move cache-branch entries into the store in ascending order").
    #[must_use]
    pub fn ascending_branch_from(&self, tip_hash: Hash) -> Vec<(Hash, TreeEntry)> {
        let mut chain = Vec::new();
        let mut cursor = tip_hash;
        while let Some(entry) = self.by_hash.get(&cursor) {
            let parent = entry.candidate.header().previous_hash;
            chain.push((cursor, entry.clone()));
            cursor = parent;
        }
        chain.reverse();
        chain
    }

    /// Number of cached entries, for diagnostics/memory accounting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// True if no entries are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::entities::{ConsensusFlags, Context, Header};

    fn header(nonce: u32, previous_hash: Hash) -> Header {
        Header {
            version: 1,
            previous_hash,
            merkle_root: [0u8; 32],
            time: 1_600_000_000,
            bits: 0x1d00_ffff,
            nonce,
        }
    }

    fn state(height: u64) -> ChainState {
        ChainState {
            context: Context {
                flags: ConsensusFlags::NONE,
                height,
                median_time_past: 0,
            },
            cumulative_work: u128::from(height),
            is_current: true,
        }
    }

    #[test]
    fn ascending_branch_orders_oldest_first() {
        let mut tree = HeaderTree::new();
        let genesis_hash = [0u8; 32];
        let h1 = header(1, genesis_hash);
        let h1_hash = h1.hash();
        let h2 = header(2, h1_hash);
        let h2_hash = h2.hash();

        tree.insert(h1_hash, Candidate::HeaderOnly(h1), state(1));
        tree.insert(h2_hash, Candidate::HeaderOnly(h2), state(2));

        let branch = tree.ascending_branch_from(h2_hash);
        assert_eq!(branch.len(), 2);
        assert_eq!(branch[0].0, h1_hash);
        assert_eq!(branch[1].0, h2_hash);
    }

    #[test]
    fn remove_drops_entry_from_forest() {
        let mut tree = HeaderTree::new();
        let h = header(9, [0u8; 32]);
        let hash = h.hash();
        tree.insert(hash, Candidate::HeaderOnly(h), state(1));
        assert!(tree.contains(&hash));
        tree.remove(&hash);
        assert!(!tree.contains(&hash));
    }
}
