//! Error types for Leasehold
//!
//! `LockError` covers every way a lock lifecycle call can fail. The boolean
//! caller API collapses all of them to `false`; the `Result` based API keeps
//! them apart.

use std::time::Duration;

/// Lock lifecycle error types
#[derive(thiserror::Error, Debug)]
pub enum LockError {
    /// No store is configured, or the configured store has been closed
    #[error("lock store unavailable")]
    Unavailable,

    #[error("lock store already configured")]
    AlreadyConfigured,

    /// The conditional create found an existing record
    #[error("lock '{key}' is held by another owner")]
    Contended { key: String },

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// Transport or store-side fault
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LockError {
    pub fn contended(key: impl Into<String>) -> Self {
        LockError::Contended { key: key.into() }
    }

    /// Whether the failure came from another holder rather than a fault
    pub fn is_contended(&self) -> bool {
        matches!(self, LockError::Contended { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, LockError::Unavailable)
    }
}

pub type Result<T> = std::result::Result<T, LockError>;
