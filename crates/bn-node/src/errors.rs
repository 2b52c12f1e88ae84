//! Node-level error taxonomy: config loading, store setup, and chaser
//! faults converted to a single exit-code-bearing type for `main`.

use crate::config::ConfigError;
use shared_types::errors::{Code, StoreError};

/// Errors that can abort node startup or force a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("fatal chain fault: {0:?}")]
    Fatal(Code),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// The process exit code §6 assigns: 0 on success, −1 on failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        -1
    }
}
