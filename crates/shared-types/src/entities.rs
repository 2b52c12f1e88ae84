//! # Core Domain Entities
//!
//! The wire/storage-level entities the node core operates on: headers,
//! blocks, transactions, and the store's compact link identifiers.
//!
//! ## Clusters
//!
//! - **Chain**: `Header`, `Block`, `Transaction`, `TxIn`, `TxOut`
//! - **Store**: `Link`, `BlockState`
//! - **Consensus context**: `Context`, `ChainState`, `ConsensusFlags`

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

// =============================================================================
// CLUSTER A: HASHES AND LINKS
// =============================================================================

/// A 32-byte double-hash identifying a header or transaction.
pub type Hash = [u8; 32];

/// An opaque, compact integer identifier assigned by the store the first
/// time an entity is archived. Links are sequential per table and never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link(pub u64);

impl Link {
    /// Sentinel value denoting "absent" (I3/I6: cache-tree entries never
    /// carry a real store link).
    pub const TERMINAL: Link = Link(u64::MAX);

    /// Returns true if this link is the terminal ("absent") sentinel.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Self::TERMINAL
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::TERMINAL
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// The 80-byte block header. Identity = `Hash` of these bytes; immutable
/// once archived (I4: every stored header has a known parent link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Header format / soft-fork signaling version.
    pub version: u32,
    /// Hash of the parent header.
    pub previous_hash: Hash,
    /// Merkle root of the block's transactions.
    pub merkle_root: Hash,
    /// Block timestamp (seconds since epoch, as claimed by the producer).
    pub time: u32,
    /// Compact proof-of-work target.
    pub bits: u32,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

impl Header {
    /// Serializes the header to its canonical 80-byte wire form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 80] {
        let mut out = [0u8; 80];
        out[0..4].copy_from_slice(&self.version.to_le_bytes());
        out[4..36].copy_from_slice(&self.previous_hash);
        out[36..68].copy_from_slice(&self.merkle_root);
        out[68..72].copy_from_slice(&self.time.to_le_bytes());
        out[72..76].copy_from_slice(&self.bits.to_le_bytes());
        out[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        out
    }

    /// Computes this header's identity hash.
    #[must_use]
    pub fn hash(&self) -> Hash {
        shared_crypto::blake3_hash(&self.to_bytes())
    }
}

/// A single transaction input: the outpoint it spends, its unlocking
/// script, and its witness stack (empty for legacy inputs).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    /// The previous output being spent.
    pub previous_output: OutPoint,
    /// The unlocking (scriptSig) bytes.
    pub script_sig: Vec<u8>,
    /// Witness stack items (empty when the input carries no witness).
    pub witness: Vec<Vec<u8>>,
    /// Relative-locktime / RBF sequence number.
    pub sequence: u32,
}

/// A reference to a specific output of a prior transaction.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// The transaction that created the referenced output.
    #[serde_as(as = "Bytes")]
    pub txid: Hash,
    /// The output's index within that transaction.
    pub index: u32,
}

/// A single transaction output: a value and the locking script that
/// guards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Value in the smallest accounting unit.
    pub value: u64,
    /// The locking (scriptPubKey) bytes.
    pub script_pubkey: Vec<u8>,
}

/// An ordered list of inputs and outputs. Identity = `txid` (serialization
/// excludes witness data, matching segwit's malleability fix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction format version.
    pub version: i32,
    /// Spent outpoints plus unlock data.
    pub inputs: Vec<TxIn>,
    /// Created outputs.
    pub outputs: Vec<TxOut>,
    /// Absolute locktime (block height or timestamp).
    pub lock_time: u32,
}

impl Transaction {
    /// Returns true if any input carries witness data.
    #[must_use]
    pub fn is_segwit(&self) -> bool {
        self.inputs.iter().any(|i| !i.witness.is_empty())
    }

    /// Computes the txid (witness-stripped double hash).
    #[must_use]
    pub fn txid(&self) -> Hash {
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.version.to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.previous_output.txid);
            buf.extend_from_slice(&input.previous_output.index.to_le_bytes());
            buf.extend_from_slice(&input.script_sig);
            buf.extend_from_slice(&input.sequence.to_le_bytes());
        }
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_le_bytes());
            buf.extend_from_slice(&output.script_pubkey);
        }
        buf.extend_from_slice(&self.lock_time.to_le_bytes());
        shared_crypto::blake3_hash(&buf)
    }

    /// Computes the witness-inclusive hash (wtxid), used for witness
    /// commitment checks. Equal to `txid()` for non-segwit transactions.
    #[must_use]
    pub fn wtxid(&self) -> Hash {
        if !self.is_segwit() {
            return self.txid();
        }
        let mut buf = Vec::new();
        buf.extend_from_slice(&self.txid());
        for input in &self.inputs {
            for item in &input.witness {
                buf.extend_from_slice(item);
            }
        }
        shared_crypto::blake3_hash(&buf)
    }
}

/// A header plus its ordered transactions, as downloaded from a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The block header.
    pub header: Header,
    /// The block's transactions, coinbase first.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Returns the block's identity hash (its header hash).
    #[must_use]
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    /// Approximate serialized size in bytes, including witness data.
    #[must_use]
    pub fn serialized_size(&self) -> usize {
        80 + self
            .transactions
            .iter()
            .map(|tx| {
                let fixed = 8
                    + tx
                        .inputs
                        .iter()
                        .map(|i| 44 + i.script_sig.len())
                        .sum::<usize>()
                    + tx.outputs
                        .iter()
                        .map(|o| 9 + o.script_pubkey.len())
                        .sum::<usize>();
                let witness: usize = tx
                    .inputs
                    .iter()
                    .flat_map(|i| i.witness.iter())
                    .map(std::vec::Vec::len)
                    .sum();
                fixed + witness
            })
            .sum::<usize>()
    }

    /// Returns true if any transaction in the block carries witness data.
    #[must_use]
    pub fn is_segwit(&self) -> bool {
        self.transactions.iter().any(Transaction::is_segwit)
    }
}

/// Either a bare header (header-first sync) or a full block. Both carry
/// enough information for the organize chaser's decision procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Candidate {
    /// A header received without its block body.
    HeaderOnly(Header),
    /// A fully downloaded block.
    Full(Block),
}

impl Candidate {
    /// Returns the header shared by both variants.
    #[must_use]
    pub fn header(&self) -> &Header {
        match self {
            Candidate::HeaderOnly(h) => h,
            Candidate::Full(b) => &b.header,
        }
    }

    /// Returns the identity hash of the candidate's header.
    #[must_use]
    pub fn hash(&self) -> Hash {
        self.header().hash()
    }

    /// Returns the full block, if this candidate carries one.
    #[must_use]
    pub fn block(&self) -> Option<&Block> {
        match self {
            Candidate::HeaderOnly(_) => None,
            Candidate::Full(b) => Some(b),
        }
    }
}

// =============================================================================
// CLUSTER C: CONSENSUS CONTEXT AND BLOCK STATE
// =============================================================================

bitflags::bitflags! {
    /// Consensus rule activations in effect for a given height (soft fork
    /// flags, e.g. BIP-NN deployments). Opaque to the core: produced and
    /// consumed only, never interpreted.
    #[derive(Serialize, Deserialize)]
    pub struct ConsensusFlags: u32 {
        /// No special rules.
        const NONE = 0;
        /// BIP16 pay-to-script-hash.
        const BIP16 = 1 << 0;
        /// BIP34 height-in-coinbase.
        const BIP34 = 1 << 1;
        /// BIP65 CHECKLOCKTIMEVERIFY.
        const BIP65 = 1 << 2;
        /// BIP66 strict DER signatures.
        const BIP66 = 1 << 3;
        /// BIP68/112/113 relative locktime.
        const BIP68 = 1 << 4;
        /// BIP141 segregated witness.
        const BIP141 = 1 << 5;
        /// BIP9 versionbits signaling in effect.
        const BIP9 = 1 << 6;
    }
}

impl Default for ConsensusFlags {
    fn default() -> Self {
        ConsensusFlags::NONE
    }
}

/// The consensus flags, height, and median-time-past in effect for a
/// header — the inputs `check()` needs and that the organize chaser
/// derives when extending a chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Context {
    /// Active consensus flags at this height.
    pub flags: ConsensusFlags,
    /// Height of the header this context describes.
    pub height: u64,
    /// Median of the last 11 block timestamps.
    pub median_time_past: u64,
}

/// The reconstructed state of a candidate chain tip: its context plus
/// cumulative proof-of-work, used to compare branches during reorg.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChainState {
    /// Consensus context at this tip.
    pub context: Context,
    /// Cumulative chain work up to and including this tip.
    pub cumulative_work: u128,
    /// True if the tip's timestamp falls within `currency_window` of now
    /// (glossary: "current").
    pub is_current: bool,
}

impl ChainState {
    /// Height of the tip this state describes.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.context.height
    }
}

/// Per-candidate-header lifecycle state. Monotone within a lifecycle
/// (I3/I5): an unconfirmable verdict is never set for a header whose
/// malleated identity failed only tx/witness commitment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockState {
    /// Candidate header archived, block body not yet downloaded.
    Unassociated,
    /// Full block archived, not yet consensus-validated.
    Archived,
    /// `block.accept`/`block.connect` succeeded.
    BlockValid,
    /// Promotable onto the confirmed chain (validated, or checkpoint/
    /// milestone bypass).
    BlockConfirmable,
    /// `block.connect` failed; never set on a confirmed header (I3).
    BlockUnconfirmable,
    /// Checkpoint/milestone bypass: treated as valid without re-running
    /// consensus checks.
    Bypassed,
}

impl BlockState {
    /// Returns true for states `get_validated_fork` treats as decidable
    /// (spec §4.6, P4): `block_valid`, `block_confirmable`, `bypassed`.
    #[must_use]
    pub fn is_decidable(self) -> bool {
        matches!(
            self,
            BlockState::BlockValid | BlockState::BlockConfirmable | BlockState::Bypassed
        )
    }

    /// Returns true if the full block body has been archived (associated).
    #[must_use]
    pub fn is_associated(self) -> bool {
        !matches!(self, BlockState::Unassociated)
    }
}

/// A `(hash, height, link)` tuple queued for download by a channel — the
/// unit the check chaser hands to peers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DownloadItem {
    /// The candidate header's identity hash.
    pub hash: Hash,
    /// The candidate header's height.
    pub height: u64,
    /// The store link assigned when the header was archived.
    pub link: Link,
}
