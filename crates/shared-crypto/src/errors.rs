//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid input for a hashing operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
