//! Store provider setup for Redis
//!
//! A provider accepts one topology for its whole lifetime. Installing into a
//! provider that is already configured fails with `AlreadyConfigured`
//! without opening a connection.

use std::sync::Arc;
use std::time::Duration;

use leasehold_common::LockError;
use leasehold_core::{LockManager, StoreProvider};
use tracing::info;

use crate::settings::LeaseholdSettings;
use crate::store::RedisLockStore;
use crate::topology::RedisTopology;

/// Connect to `topology` and make it the provider's store
pub async fn install(
    provider: &StoreProvider,
    topology: &RedisTopology,
    ping_timeout: Duration,
) -> Result<(), LockError> {
    if provider.is_configured() {
        return Err(LockError::AlreadyConfigured);
    }

    let store = RedisLockStore::connect(topology, ping_timeout).await?;
    provider.configure(Arc::new(store))?;

    info!(topology = topology.name(), "Redis lock store installed");
    Ok(())
}

/// Install a single Redis node
pub async fn install_standalone(
    provider: &StoreProvider,
    url: &str,
    ping_timeout: Duration,
) -> Result<(), LockError> {
    install(provider, &RedisTopology::standalone(url), ping_timeout).await
}

/// Install a sharded Redis cluster
pub async fn install_cluster(
    provider: &StoreProvider,
    nodes: &[&str],
    ping_timeout: Duration,
) -> Result<(), LockError> {
    install(provider, &RedisTopology::cluster(nodes.iter().copied()), ping_timeout).await
}

/// Install a sentinel-managed primary/replica group
pub async fn install_failover(
    provider: &StoreProvider,
    master_name: &str,
    sentinels: &[&str],
    ping_timeout: Duration,
) -> Result<(), LockError> {
    let topology = RedisTopology::failover(master_name, sentinels.iter().copied());
    install(provider, &topology, ping_timeout).await
}

/// Build a lock manager on a fresh provider from `settings`
pub async fn connect_manager(settings: &LeaseholdSettings) -> Result<LockManager, LockError> {
    settings.validate()?;

    let provider = Arc::new(StoreProvider::new());
    install(&provider, &settings.redis, settings.ping_timeout()).await?;

    LockManager::new(provider, settings.lock.clone())
}
