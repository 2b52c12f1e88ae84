//! Configuration the snapshot chaser consults (§4.7, §6).

/// The subset of `node` configuration the snapshot chaser needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotSettings {
    /// Whether neutrino filter heads are maintained, mirrored here so the
    /// snapshot chaser can decide whether a prune also needs to retain
    /// filter-head history (unused by the reference store adapter).
    pub filter_enabled: bool,
}
