//! Lease renewal task
//!
//! One task per held key. On every tick it pushes the record's expiry out by
//! the lease TTL. It stops when cancelled, or for good on the first refresh
//! that fails or finds the record gone; it never retries. A lost lease is
//! left to expire in the store.

use std::sync::{Arc, Weak};
use std::time::Duration;

use leasehold_common::LockError;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, trace, warn};

use crate::registry::{RenewalHandle, RenewalRegistry};
use crate::store::LockStore;

/// Why a renewal task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalExit {
    /// Stopped through its cancellation signal
    Cancelled,
    /// The record no longer existed when refreshed
    LeaseLost,
    /// The refresh call failed or timed out
    Failed,
}

/// Renewal loop for a single lock key
pub struct RenewalTask {
    key: String,
    store: Arc<dyn LockStore>,
    registry: Weak<RenewalRegistry>,
    id: u64,
    lease_ttl: Duration,
    interval: Duration,
    call_timeout: Duration,
}

impl RenewalTask {
    pub fn new(
        key: impl Into<String>,
        store: Arc<dyn LockStore>,
        registry: &Arc<RenewalRegistry>,
        lease_ttl: Duration,
        interval: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self {
            key: key.into(),
            store,
            registry: Arc::downgrade(registry),
            id: registry.next_id(),
            lease_ttl,
            interval,
            call_timeout,
        }
    }

    /// Start the loop on the runtime, detached from the calling task
    pub fn spawn(self) -> RenewalHandle {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let id = self.id;
        let task = tokio::spawn(self.run(stop_rx));
        RenewalHandle::new(id, stop_tx, task)
    }

    async fn run(self, mut stop_rx: mpsc::Receiver<()>) -> RenewalExit {
        // First refresh one interval after acquisition
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.renew_once().await {
                        Ok(true) => {
                            trace!(key = %self.key, "Lease renewed");
                        }
                        Ok(false) => {
                            warn!(key = %self.key, "Lease lost, record no longer exists");
                            break RenewalExit::LeaseLost;
                        }
                        Err(e) => {
                            warn!(key = %self.key, error = %e, "Lease renewal failed");
                            break RenewalExit::Failed;
                        }
                    }
                }
                // A dropped sender counts as cancellation
                _ = stop_rx.recv() => {
                    debug!(key = %self.key, "Renewal task cancelled");
                    break RenewalExit::Cancelled;
                }
            }
        };

        if exit != RenewalExit::Cancelled
            && let Some(registry) = self.registry.upgrade()
        {
            registry.remove_if_current(&self.key, self.id);
        }

        exit
    }

    async fn renew_once(&self) -> Result<bool, LockError> {
        match tokio::time::timeout(
            self.call_timeout,
            self.store.refresh_expiry(&self.key, self.lease_ttl),
        )
        .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(LockError::Timeout(self.call_timeout)),
        }
    }
}
