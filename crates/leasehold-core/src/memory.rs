// In-memory lock store
// Records expire on the tokio clock, so paused-time tests drive expiry deterministically

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::time::Instant;
use tracing::debug;

use crate::store::LockStore;

/// Acquisitions between two sweeps of expired records
const SWEEP_EVERY: u64 = 256;

struct MemoryRecord {
    value: String,
    expires_at: Instant,
}

impl MemoryRecord {
    fn new(value: &str, expires_at: Instant) -> Self {
        Self {
            value: value.to_string(),
            expires_at,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Lock store kept in process memory.
///
/// Shared between several `LockManager`s it behaves like one store seen by
/// several processes. `set_available(false)` makes every operation fail as
/// if the store had become unreachable.
///
/// Expired records are swept every few hundred acquisitions, so keys that are
/// taken once and never released do not pile up.
pub struct MemoryLockStore {
    records: DashMap<String, MemoryRecord>,
    acquisitions: AtomicU64,
    available: AtomicBool,
    closed: AtomicBool,
}

impl Default for MemoryLockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            acquisitions: AtomicU64::new(0),
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulate the store going away (`false`) or coming back (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Whether a live (unexpired) record exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.records
            .get(key)
            .is_some_and(|record| !record.is_expired(now))
    }

    /// Value of the live record for `key`
    pub fn value(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.records
            .get(key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.value.clone())
    }

    /// Time left before the record for `key` expires
    pub fn remaining_ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.records
            .get(key)
            .filter(|record| !record.is_expired(now))
            .map(|record| record.expires_at - now)
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.records
            .iter()
            .filter(|record| !record.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired records, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now));
        let purged = before.saturating_sub(self.records.len());
        if purged > 0 {
            debug!(count = purged, "Purged expired lock records");
        }
        purged
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            anyhow::bail!("memory store is closed");
        }
        if !self.available.load(Ordering::SeqCst) {
            anyhow::bail!("memory store is unreachable");
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn acquire_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> anyhow::Result<bool> {
        self.check()?;
        if self.acquisitions.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            self.purge_expired();
        }
        let now = Instant::now();

        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_expired(now) {
                    entry.insert(MemoryRecord::new(value, now + ttl));
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(MemoryRecord::new(value, now + ttl));
                Ok(true)
            }
        }
    }

    async fn refresh_expiry(&self, key: &str, ttl: Duration) -> anyhow::Result<bool> {
        self.check()?;
        let now = Instant::now();

        let refreshed = match self.records.get_mut(key) {
            Some(mut record) if !record.is_expired(now) => {
                record.expires_at = now + ttl;
                true
            }
            _ => false,
        };
        Ok(refreshed)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<u64> {
        self.check()?;
        let now = Instant::now();

        match self.records.remove(key) {
            Some((_, record)) if !record.is_expired(now) => Ok(1),
            _ => Ok(0),
        }
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.check()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.records.clear();
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
