//! Configuration the validate chaser's dispatch loop consults (§4.5, §6).

/// The subset of `node` configuration the validate chaser needs.
#[derive(Debug, Clone, Copy)]
pub struct ValidateSettings {
    /// Upper bound on concurrently in-flight validations (`backlog_`).
    pub maximum_backlog: usize,
}

impl Default for ValidateSettings {
    fn default() -> Self {
        Self { maximum_backlog: 64 }
    }
}
