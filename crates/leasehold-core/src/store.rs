//! Store Adapter contract
//!
//! The lock lifecycle needs exactly three store operations. Implementations
//! propagate transport and store faults instead of masking them; bounding
//! each call with a deadline is the caller's job.

use std::time::Duration;

use async_trait::async_trait;

/// Uniform interface over a key-value store holding lock records
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Create the record for `key` only if it is absent.
    ///
    /// Returns `true` iff this call created the record. Of several concurrent
    /// calls for the same key exactly one succeeds.
    async fn acquire_if_absent(&self, key: &str, value: &str, ttl: Duration)
    -> anyhow::Result<bool>;

    /// Reset the expiry of an existing record.
    ///
    /// Returns `false` when the record does not exist (expired or deleted).
    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> anyhow::Result<bool>;

    /// Remove the record, returning the number of records removed (0 or 1)
    async fn delete(&self, key: &str) -> anyhow::Result<u64>;

    /// Liveness probe
    async fn ping(&self) -> anyhow::Result<()>;

    /// Release the underlying connection(s). Later calls fail.
    async fn close(&self);

    /// Short name of the backing store, used in logs
    fn kind(&self) -> &'static str;
}
