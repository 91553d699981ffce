//! Lock Lifecycle Manager
//!
//! Acquire: one conditional create with the lease TTL, then a renewal task
//! is spawned and registered for the key. Release: delete the record, then
//! cancel and deregister the key's renewal task regardless of the delete's
//! outcome. No call is ever retried; every store call is time-bounded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leasehold_common::{LockError, holder_marker};
use tracing::{debug, info};

use crate::options::LockOptions;
use crate::provider::StoreProvider;
use crate::registry::RenewalRegistry;
use crate::renewal::RenewalTask;
use crate::store::LockStore;

/// Boolean lock API
#[async_trait]
pub trait Locker: Send + Sync {
    /// Single non-blocking attempt to take `key`.
    ///
    /// `true` means this call established exclusive ownership. Contention,
    /// store faults and an unconfigured store all yield `false`.
    async fn try_lock(&self, key: &str, timeout: Option<Duration>) -> bool;

    /// Release `key`.
    ///
    /// `true` means this call removed an existing lock record; it says
    /// nothing about whether a renewal task was running.
    async fn unlock(&self, key: &str, timeout: Option<Duration>) -> bool;
}

/// Drives acquire / renew / release against the configured store
pub struct LockManager {
    provider: Arc<StoreProvider>,
    registry: Arc<RenewalRegistry>,
    options: LockOptions,
}

impl LockManager {
    pub fn new(provider: Arc<StoreProvider>, options: LockOptions) -> Result<Self, LockError> {
        options.validate()?;
        Ok(Self {
            provider,
            registry: Arc::new(RenewalRegistry::new()),
            options,
        })
    }

    /// Manager bound to a dedicated provider already holding `store`
    pub fn with_store(store: Arc<dyn LockStore>, options: LockOptions) -> Result<Self, LockError> {
        Self::new(Arc::new(StoreProvider::with_store(store)), options)
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    pub fn provider(&self) -> &Arc<StoreProvider> {
        &self.provider
    }

    /// Take `key`, telling contention apart from faults.
    ///
    /// `timeout` bounds the store call; `None` applies the configured
    /// execute timeout.
    pub async fn try_acquire(&self, key: &str, timeout: Option<Duration>) -> Result<(), LockError> {
        let store = self.provider.require()?;
        let bound = timeout.unwrap_or_else(|| self.options.execute_timeout());
        let lease_ttl = self.options.lease_ttl();
        let marker = holder_marker();

        let created = bounded(bound, store.acquire_if_absent(key, &marker, lease_ttl)).await?;
        if !created {
            debug!(key, "Lock is held elsewhere");
            return Err(LockError::contended(key));
        }

        // The renewal loop outlives this call and is bounded on its own
        let handle = RenewalTask::new(
            key,
            store,
            &self.registry,
            lease_ttl,
            self.options.renewal_interval(),
            self.options.execute_timeout(),
        )
        .spawn();
        self.registry.register(key, handle);

        debug!(key, ttl_ms = self.options.lease_ttl_ms, "Lock acquired");
        Ok(())
    }

    /// Release `key`.
    ///
    /// Returns whether this call removed a lock record. The renewal task for
    /// `key` is cancelled in every case, even when no store is configured.
    pub async fn release(&self, key: &str, timeout: Option<Duration>) -> Result<bool, LockError> {
        let deleted = match self.provider.require() {
            Ok(store) => {
                let bound = timeout.unwrap_or_else(|| self.options.execute_timeout());
                bounded(bound, store.delete(key)).await.map(|count| count > 0)
            }
            Err(e) => Err(e),
        };

        let cancelled = self.registry.cancel_and_remove(key);
        debug!(
            key,
            deleted = matches!(deleted, Ok(true)),
            cancelled,
            "Lock released"
        );

        deleted
    }

    /// Whether a renewal task is currently running for `key`
    pub fn is_renewing(&self, key: &str) -> bool {
        self.registry.is_active(key)
    }

    /// Number of keys with a registered renewal task
    pub fn renewing_count(&self) -> usize {
        self.registry.len()
    }

    /// Stop every renewal task and close the store.
    ///
    /// Records still in the store expire on their own after the lease TTL.
    pub async fn shutdown(&self) {
        let cancelled = self.registry.cancel_all();
        self.provider.close().await;
        info!(cancelled, "Lock manager shut down");
    }
}

#[async_trait]
impl Locker for LockManager {
    async fn try_lock(&self, key: &str, timeout: Option<Duration>) -> bool {
        match self.try_acquire(key, timeout).await {
            Ok(()) => true,
            Err(LockError::Contended { .. }) => false,
            Err(e) => {
                debug!(key, error = %e, "Lock not acquired");
                false
            }
        }
    }

    async fn unlock(&self, key: &str, timeout: Option<Duration>) -> bool {
        match self.release(key, timeout).await {
            Ok(deleted) => deleted,
            Err(e) => {
                debug!(key, error = %e, "Lock not released");
                false
            }
        }
    }
}

async fn bounded<T, F>(bound: Duration, call: F) -> Result<T, LockError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(bound, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(LockError::Timeout(bound)),
    }
}
