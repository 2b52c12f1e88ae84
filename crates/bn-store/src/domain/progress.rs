//! Progress reporting for long operations (§4.2: "each reports progress by
//! invoking a `(event, table)` callback per table it touches").

/// One of the tables named in §6's persistent layout. `Address` and
/// `Neutrino` are optional in the design; they're modeled here so a
/// progress callback can name them even when a deployment disables them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTable {
    HeaderHead,
    HeaderBody,
    Txs,
    Tx,
    Point,
    Input,
    Output,
    Puts,
    Spend,
    StrongTx,
    ValidatedTx,
    ValidatedBk,
    Candidate,
    Confirmed,
    Address,
    Neutrino,
}

/// Progress events a table-touching operation (`open`, `snapshot`, `restore`,
/// `reload`) reports as it walks the table set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// Table opened/created.
    Start,
    /// The operation is waiting for a writer lock on this table to release
    /// (§4.2: "`wait_lock` events emitted during snapshot must cause the
    /// caller to suspend peer channels").
    WaitLock,
    /// Table copy/verify complete.
    Complete,
}

/// A progress callback: `(event, table)` per §4.2.
pub type ProgressCallback<'a> = dyn FnMut(StoreEvent, StoreTable) + Send + 'a;
