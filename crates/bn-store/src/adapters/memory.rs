//! In-memory reference implementation of [`ChainStore`] (§4.2.1). Backs
//! unit and integration tests; a production deployment would swap this for
//! a memory-mapped hash-table archive without changing any chaser code.

use crate::domain::progress::{ProgressCallback, StoreEvent, StoreTable};
use crate::domain::state::{Association, ValidatedForkEntry};
use crate::ports::{ChainStore, StoreResult};
use parking_lot::RwLock;
use shared_types::entities::{Block, BlockState, ChainState, Context, Hash, Header, Link};
use shared_types::errors::StoreError;
use std::collections::HashMap;

#[derive(Clone)]
struct HeaderRecord {
    header: Header,
    context: Context,
    parent: Link,
    state: BlockState,
    strong: bool,
    fees: u64,
    block: Option<Block>,
    filter_head: bool,
}

#[derive(Default, Clone)]
struct Tables {
    by_hash: HashMap<Hash, Link>,
    by_link: HashMap<Link, HeaderRecord>,
    candidate: Vec<Link>,
    confirmed: Vec<Link>,
    next_link: u64,
}

#[derive(Clone)]
struct Snapshot {
    tables: Tables,
    generation: u64,
}

struct Inner {
    tables: Tables,
    checkpoints: Vec<u64>,
    milestone_height: Option<u64>,
    snapshot: Option<Snapshot>,
    generation: u64,
    fault: Option<StoreError>,
    full: bool,
}

/// In-memory archive adapter (§4.2.1). Not crash-safe in the literal sense
/// (no disk I/O) but honors the same consistency contract: `snapshot()`
/// captures a deep copy, `restore()` replaces live tables with it.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store. Call [`ChainStore::initialize`] before use
    /// (I7: genesis must be archived and confirmed at height 0 first).
    #[must_use]
    pub fn new(checkpoints: Vec<u64>, milestone_height: Option<u64>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                tables: Tables::default(),
                checkpoints,
                milestone_height,
                snapshot: None,
                generation: 0,
                fault: None,
                full: false,
            }),
        }
    }

    fn next_link(tables: &mut Tables) -> Link {
        let link = Link(tables.next_link);
        tables.next_link += 1;
        link
    }
}

impl ChainStore for MemoryStore {
    fn initialize(&self, genesis: &Block) -> StoreResult<Link> {
        let mut inner = self.inner.write();
        let hash = genesis.hash();
        let context = Context {
            flags: shared_types::entities::ConsensusFlags::NONE,
            height: 0,
            median_time_past: u64::from(genesis.header.time),
        };
        let link = Self::next_link(&mut inner.tables);
        inner.tables.by_hash.insert(hash, link);
        inner.tables.by_link.insert(
            link,
            HeaderRecord {
                header: genesis.header,
                context,
                parent: Link::TERMINAL,
                state: BlockState::BlockConfirmable,
                strong: true,
                fees: 0,
                block: Some(genesis.clone()),
                filter_head: false,
            },
        );
        inner.tables.candidate.push(link);
        inner.tables.confirmed.push(link);
        Ok(link)
    }

    fn open(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()> {
        for table in ALL_TABLES {
            progress(StoreEvent::Start, table);
            progress(StoreEvent::Complete, table);
        }
        Ok(())
    }

    fn close(&self) -> StoreResult<()> {
        Ok(())
    }

    fn snapshot(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()> {
        let mut inner = self.inner.write();
        for table in ALL_TABLES {
            progress(StoreEvent::WaitLock, table);
        }
        inner.generation += 1;
        let generation = inner.generation;
        let tables = inner.tables.clone();
        inner.snapshot = Some(Snapshot { tables, generation });
        for table in ALL_TABLES {
            progress(StoreEvent::Complete, table);
        }
        Ok(())
    }

    fn restore(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let Some(snapshot) = inner.snapshot.clone() else {
            return Err(StoreError::FlushLock);
        };
        for table in ALL_TABLES {
            progress(StoreEvent::Start, table);
        }
        inner.tables = snapshot.tables;
        for table in ALL_TABLES {
            progress(StoreEvent::Complete, table);
        }
        Ok(())
    }

    fn reload(&self, progress: &mut ProgressCallback<'_>) -> StoreResult<()> {
        self.open(progress)
    }

    fn get_top_candidate(&self) -> u64 {
        let inner = self.inner.read();
        inner.tables.candidate.len().saturating_sub(1) as u64
    }

    fn get_top_confirmed(&self) -> u64 {
        let inner = self.inner.read();
        inner.tables.confirmed.len().saturating_sub(1) as u64
    }

    fn get_top_associated(&self) -> u64 {
        let inner = self.inner.read();
        inner
            .tables
            .candidate
            .iter()
            .enumerate()
            .rev()
            .find(|(_, link)| {
                inner
                    .tables
                    .by_link
                    .get(link)
                    .is_some_and(|r| r.state.is_associated())
            })
            .map_or(0, |(i, _)| i as u64)
    }

    fn get_fork(&self) -> u64 {
        let inner = self.inner.read();
        let mut fork = 0u64;
        for (i, (c, k)) in inner
            .tables
            .candidate
            .iter()
            .zip(inner.tables.confirmed.iter())
            .enumerate()
        {
            if c != k {
                break;
            }
            fork = i as u64;
        }
        fork
    }

    fn get_unassociated_above(&self, height: u64, limit: usize, stop: u64) -> Vec<Association> {
        let inner = self.inner.read();
        let mut out = Vec::new();
        let mut h = height + 1;
        while h <= stop && out.len() < limit {
            if let Some(link) = inner.tables.candidate.get(h as usize).copied() {
                if let Some(record) = inner.tables.by_link.get(&link) {
                    if !record.state.is_associated() {
                        out.push(Association { height: h, link });
                    }
                }
            } else {
                break;
            }
            h += 1;
        }
        out
    }

    fn get_unassociated_count(&self) -> usize {
        let inner = self.inner.read();
        inner
            .tables
            .candidate
            .iter()
            .filter_map(|link| inner.tables.by_link.get(link))
            .filter(|r| !r.state.is_associated())
            .count()
    }

    fn to_candidate(&self, height: u64) -> Link {
        let inner = self.inner.read();
        inner
            .tables
            .candidate
            .get(height as usize)
            .copied()
            .unwrap_or(Link::TERMINAL)
    }

    fn to_confirmed(&self, height: u64) -> Link {
        let inner = self.inner.read();
        inner
            .tables
            .confirmed
            .get(height as usize)
            .copied()
            .unwrap_or(Link::TERMINAL)
    }

    fn to_header(&self, hash: Hash) -> Link {
        let inner = self.inner.read();
        inner.tables.by_hash.get(&hash).copied().unwrap_or(Link::TERMINAL)
    }

    fn to_parent(&self, link: Link) -> Link {
        let inner = self.inner.read();
        inner
            .tables
            .by_link
            .get(&link)
            .map_or(Link::TERMINAL, |r| r.parent)
    }

    fn height_of(&self, link: Link) -> Option<u64> {
        let inner = self.inner.read();
        inner
            .tables
            .candidate
            .iter()
            .position(|l| *l == link)
            .or_else(|| inner.tables.confirmed.iter().position(|l| *l == link))
            .map(|i| i as u64)
    }

    fn get_header(&self, link: Link) -> Option<Header> {
        let inner = self.inner.read();
        inner.tables.by_link.get(&link).map(|r| r.header)
    }

    fn get_block(&self, link: Link) -> Option<Block> {
        let inner = self.inner.read();
        inner.tables.by_link.get(&link).and_then(|r| r.block.clone())
    }

    fn get_context(&self, link: Link) -> Option<Context> {
        let inner = self.inner.read();
        inner.tables.by_link.get(&link).map(|r| r.context)
    }

    fn is_associated(&self, link: Link) -> bool {
        let inner = self.inner.read();
        inner
            .tables
            .by_link
            .get(&link)
            .is_some_and(|r| r.state.is_associated())
    }

    fn is_milestone(&self, link: Link) -> bool {
        let inner = self.inner.read();
        let Some(record) = inner.tables.by_link.get(&link) else {
            return false;
        };
        inner
            .milestone_height
            .is_some_and(|m| record.context.height >= m)
    }

    fn is_under_checkpoint(&self, height: u64) -> bool {
        let inner = self.inner.read();
        inner.checkpoints.iter().any(|&c| height <= c)
    }

    fn set_link(&self, header: &Header, context: Context) -> Link {
        let mut inner = self.inner.write();
        let hash = header.hash();
        if let Some(existing) = inner.tables.by_hash.get(&hash) {
            return *existing;
        }
        let parent = inner
            .tables
            .by_hash
            .get(&header.previous_hash)
            .copied()
            .unwrap_or(Link::TERMINAL);
        let link = Self::next_link(&mut inner.tables);
        inner.tables.by_hash.insert(hash, link);
        inner.tables.by_link.insert(
            link,
            HeaderRecord {
                header: *header,
                context,
                parent,
                state: BlockState::Unassociated,
                strong: false,
                fees: 0,
                block: None,
                filter_head: false,
            },
        );
        link
    }

    fn set_code(&self, link: Link, block: &Block, checked: bool) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.block = Some(block.clone());
        record.state = BlockState::Archived;
        if checked {
            record.strong = true;
        }
        Ok(())
    }

    fn is_strong(&self, link: Link) -> bool {
        let inner = self.inner.read();
        inner.tables.by_link.get(&link).is_some_and(|r| r.strong)
    }

    fn set_strong(&self, link: Link) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.strong = true;
        Ok(())
    }

    fn set_unstrong(&self, link: Link) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.strong = false;
        Ok(())
    }

    fn push_candidate(&self, link: Link) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner.tables.by_link.contains_key(&link) {
            return Err(StoreError::Integrity);
        }
        inner.tables.candidate.push(link);
        Ok(())
    }

    fn pop_candidate(&self) -> StoreResult<Link> {
        let mut inner = self.inner.write();
        inner.tables.candidate.pop().ok_or(StoreError::Integrity)
    }

    fn push_confirmed(&self, link: Link, strong: bool) -> StoreResult<()> {
        let mut inner = self.inner.write();
        if !inner.tables.by_link.contains_key(&link) {
            return Err(StoreError::Integrity);
        }
        inner.tables.confirmed.push(link);
        if strong {
            if let Some(record) = inner.tables.by_link.get_mut(&link) {
                record.strong = true;
            }
        }
        Ok(())
    }

    fn pop_confirmed(&self) -> StoreResult<Link> {
        let mut inner = self.inner.write();
        inner.tables.confirmed.pop().ok_or(StoreError::Integrity)
    }

    fn get_block_state(&self, link: Link) -> BlockState {
        let inner = self.inner.read();
        inner
            .tables
            .by_link
            .get(&link)
            .map_or(BlockState::Unassociated, |r| r.state)
    }

    fn set_block_valid(&self, link: Link, fees: u64) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.state = BlockState::BlockValid;
        record.fees = fees;
        Ok(())
    }

    fn set_block_confirmable(&self, link: Link) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.state = BlockState::BlockConfirmable;
        Ok(())
    }

    fn set_block_unconfirmable(&self, link: Link) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.state = BlockState::BlockUnconfirmable;
        Ok(())
    }

    fn block_confirmable(&self, link: Link) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.state = BlockState::BlockConfirmable;
        Ok(())
    }

    fn set_filter_head(&self, link: Link) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let record = inner
            .tables
            .by_link
            .get_mut(&link)
            .ok_or(StoreError::Integrity)?;
        record.filter_head = true;
        Ok(())
    }

    fn get_validated_fork(
        &self,
        _checkpoint: bool,
        _filter_enabled: bool,
    ) -> (u64, Vec<ValidatedForkEntry>) {
        let inner = self.inner.read();
        let fork = {
            let mut fork = 0u64;
            for (i, (c, k)) in inner
                .tables
                .candidate
                .iter()
                .zip(inner.tables.confirmed.iter())
                .enumerate()
            {
                if c != k {
                    break;
                }
                fork = i as u64;
            }
            fork
        };
        let mut entries = Vec::new();
        let mut height = fork + 1;
        while let Some(link) = inner.tables.candidate.get(height as usize).copied() {
            let Some(record) = inner.tables.by_link.get(&link) else {
                break;
            };
            if !record.state.is_decidable() {
                break;
            }
            entries.push(ValidatedForkEntry {
                height,
                link,
                state: record.state,
            });
            height += 1;
        }
        (fork, entries)
    }

    fn get_candidate_chain_state(&self, height: u64) -> Option<ChainState> {
        let inner = self.inner.read();
        let link = inner.tables.candidate.get(height as usize).copied()?;
        let record = inner.tables.by_link.get(&link)?;
        let cumulative_work = inner
            .tables
            .candidate
            .iter()
            .take((height + 1) as usize)
            .filter_map(|l| inner.tables.by_link.get(l))
            .map(|r| u128::from(r.header.bits))
            .sum();
        Some(ChainState {
            context: record.context,
            cumulative_work,
            is_current: true,
        })
    }

    fn get_work(&self, from: u64, to: u64) -> u128 {
        let inner = self.inner.read();
        inner
            .tables
            .candidate
            .iter()
            .enumerate()
            .filter(|(i, _)| (*i as u64) > from && (*i as u64) <= to)
            .filter_map(|(_, l)| inner.tables.by_link.get(l))
            .map(|r| u128::from(r.header.bits))
            .sum()
    }

    fn is_full(&self) -> bool {
        self.inner.read().full
    }

    fn is_fault(&self) -> bool {
        self.inner.read().fault.is_some()
    }

    fn get_fault(&self) -> Option<StoreError> {
        self.inner.read().fault
    }

    fn get_space(&self) -> u64 {
        u64::MAX
    }

    fn clear_errors(&self) {
        let mut inner = self.inner.write();
        inner.fault = None;
        inner.full = false;
    }

    fn is_coalesced(&self) -> bool {
        let inner = self.inner.read();
        inner.tables.confirmed.len() == inner.tables.candidate.len()
    }

    fn prune(&self) -> StoreResult<()> {
        // No prevout cache is modeled in the reference adapter; a real
        // memory-mapped store would compact its `point`/`puts` tables here.
        Ok(())
    }
}

const ALL_TABLES: [StoreTable; 16] = [
    StoreTable::HeaderHead,
    StoreTable::HeaderBody,
    StoreTable::Txs,
    StoreTable::Tx,
    StoreTable::Point,
    StoreTable::Input,
    StoreTable::Output,
    StoreTable::Puts,
    StoreTable::Spend,
    StoreTable::StrongTx,
    StoreTable::ValidatedTx,
    StoreTable::ValidatedBk,
    StoreTable::Candidate,
    StoreTable::Confirmed,
    StoreTable::Address,
    StoreTable::Neutrino,
];
