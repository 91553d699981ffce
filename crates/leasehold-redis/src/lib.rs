//! Leasehold Redis - Redis-backed lock store
//!
//! This crate provides:
//! - `RedisLockStore` over a standalone node, a cluster or a sentinel group
//! - Provider installation with a bounded liveness probe
//! - Settings loading from file and environment
//!
//! ```no_run
//! use leasehold_core::Locker;
//! use leasehold_redis::{LeaseholdSettings, connect_manager};
//!
//! # async fn example() -> Result<(), leasehold_common::LockError> {
//! let settings = LeaseholdSettings::load(Some("conf/leasehold.toml"))?;
//! let locker = connect_manager(&settings).await?;
//!
//! if locker.try_lock("reports:nightly", None).await {
//!     // critical section
//!     locker.unlock("reports:nightly", None).await;
//! }
//!
//! locker.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod settings;
pub mod store;
pub mod topology;

pub use bootstrap::{
    connect_manager, install, install_cluster, install_failover, install_standalone,
};
pub use settings::LeaseholdSettings;
pub use store::RedisLockStore;
pub use topology::{DEFAULT_REDIS_URL, RedisTopology};
