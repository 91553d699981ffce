//! Leasehold Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used across all Leasehold components:
//! - Lock error taxonomy
//! - Host identity helpers (hostname, local IP, holder marker)
//! - Tracing subscriber bootstrap
//! - Default lease timings

pub mod error;
pub mod logging;
pub mod utils;

// Re-exports for convenience
pub use error::{LockError, Result};
pub use utils::{holder_marker, local_hostname, local_ip};

/// Default lease time-to-live in milliseconds
pub const DEFAULT_LEASE_TTL_MS: u64 = 10_000;

/// Default interval between renewal ticks in milliseconds
pub const DEFAULT_RENEWAL_INTERVAL_MS: u64 = 1_000;

/// Default bound applied to a store call when the caller supplies none
pub const DEFAULT_EXECUTE_TIMEOUT_MS: u64 = 3_000;

/// Default bound for the liveness probe issued while connecting to a store
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 3_000;

/// Environment variable prefix for settings overrides
pub const ENV_PREFIX: &str = "LEASEHOLD";
