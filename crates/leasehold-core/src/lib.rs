//! Leasehold Core - Lease-based mutual exclusion over a shared key-value store
//!
//! This crate provides:
//! - The store adapter contract (`LockStore`) and an in-memory store
//! - The store provider holding the one store selected for a process
//! - The renewal registry and per-key renewal tasks
//! - The lock lifecycle manager (`LockManager`, `Locker`)

pub mod manager;
pub mod memory;
pub mod options;
pub mod provider;
pub mod registry;
pub mod renewal;
pub mod store;

pub use leasehold_common::{LockError, Result};
pub use manager::{LockManager, Locker};
pub use memory::MemoryLockStore;
pub use options::LockOptions;
pub use provider::StoreProvider;
pub use registry::{RenewalHandle, RenewalRegistry};
pub use renewal::{RenewalExit, RenewalTask};
pub use store::LockStore;
