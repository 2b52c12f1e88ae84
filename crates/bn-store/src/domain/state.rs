//! Query result shapes returned by [`crate::ChainStore`] (§4.2).

use shared_types::entities::{BlockState, Link};

/// One entry of `get_unassociated_above`: a candidate height whose block
/// body has not yet been archived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub height: u64,
    pub link: Link,
}

/// One entry of `get_validated_fork` (§4.2): a candidate height above the
/// fork point together with the block state the confirm chaser must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedForkEntry {
    pub height: u64,
    pub link: Link,
    pub state: BlockState,
}
