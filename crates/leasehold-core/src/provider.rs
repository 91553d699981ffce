//! Store Provider
//!
//! Holds the one store selected for the process. A provider is configured at
//! most once; after `close` it stays closed and every lookup reports the
//! store as unavailable.

use std::sync::Arc;

use leasehold_common::LockError;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::store::LockStore;

enum ProviderState {
    Unconfigured,
    Ready(Arc<dyn LockStore>),
    Closed,
}

/// Explicit, shareable slot for the configured lock store
pub struct StoreProvider {
    state: RwLock<ProviderState>,
}

impl Default for StoreProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreProvider {
    /// Create an unconfigured provider
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ProviderState::Unconfigured),
        }
    }

    /// Create a provider already bound to `store`
    pub fn with_store(store: Arc<dyn LockStore>) -> Self {
        Self {
            state: RwLock::new(ProviderState::Ready(store)),
        }
    }

    /// Bind the provider to `store`.
    ///
    /// Fails with `AlreadyConfigured` on any call after the first successful
    /// one, including after the provider was closed.
    pub fn configure(&self, store: Arc<dyn LockStore>) -> Result<(), LockError> {
        let mut state = self.state.write();
        match *state {
            ProviderState::Unconfigured => {
                info!(store = store.kind(), "Lock store configured");
                *state = ProviderState::Ready(store);
                Ok(())
            }
            ProviderState::Ready(_) | ProviderState::Closed => {
                warn!("Ignoring repeated lock store configuration");
                Err(LockError::AlreadyConfigured)
            }
        }
    }

    /// Whether `configure` has already succeeded
    pub fn is_configured(&self) -> bool {
        !matches!(*self.state.read(), ProviderState::Unconfigured)
    }

    /// The active store, if any
    pub fn store(&self) -> Option<Arc<dyn LockStore>> {
        match &*self.state.read() {
            ProviderState::Ready(store) => Some(store.clone()),
            _ => None,
        }
    }

    /// The active store, or `Unavailable`
    pub fn require(&self) -> Result<Arc<dyn LockStore>, LockError> {
        self.store().ok_or(LockError::Unavailable)
    }

    /// Close the store connection(s). Idempotent.
    pub async fn close(&self) {
        let previous = {
            let mut state = self.state.write();
            std::mem::replace(&mut *state, ProviderState::Closed)
        };

        if let ProviderState::Ready(store) = previous {
            store.close().await;
            info!(store = store.kind(), "Lock store closed");
        }
    }
}
