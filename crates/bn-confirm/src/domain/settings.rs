//! Configuration the confirm chaser's reorganize pass consults (§4.6, §6).

/// The subset of `node` configuration the confirm chaser needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfirmSettings {
    /// Whether neutrino filter heads are maintained (§4.6: `filter_enabled`
    /// argument to `get_validated_fork`).
    pub filter_enabled: bool,
    /// Confirmed-tip distance from the network height below which `recent_`
    /// becomes true (§4.6.1: "within a small number of blocks").
    pub recent_threshold: u64,
}
