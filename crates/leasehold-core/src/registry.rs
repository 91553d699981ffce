//! Renewal Registry
//!
//! Maps each held lock key to the handle of its renewal task. A single mutex
//! guards the map; it is only held for map mutation and never across a store
//! call or a cancellation signal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::debug;

use crate::renewal::RenewalExit;

/// Handle to a running renewal task
pub struct RenewalHandle {
    id: u64,
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<RenewalExit>,
}

impl RenewalHandle {
    pub(crate) fn new(id: u64, stop_tx: mpsc::Sender<()>, task: JoinHandle<RenewalExit>) -> Self {
        Self { id, stop_tx, task }
    }

    /// Generation id, unique within one registry
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the task has already exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the task to stop. Never blocks, and is a no-op once the task has exited.
    ///
    /// Dropping the handle afterwards detaches the task; it still sees the
    /// signal and exits on its own.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// Wait for the task to exit
    pub async fn join(self) -> Result<RenewalExit, JoinError> {
        self.task.await
    }
}

/// Concurrency-safe `key -> renewal task` map
pub struct RenewalRegistry {
    entries: Mutex<HashMap<String, RenewalHandle>>,
    next_id: AtomicU64,
}

impl Default for RenewalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RenewalRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a generation id for a new renewal task
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Record `handle` under `key`.
    ///
    /// Last writer wins: a handle already registered for `key` is cancelled.
    pub fn register(&self, key: &str, handle: RenewalHandle) {
        let displaced = self.entries.lock().insert(key.to_string(), handle);

        if let Some(old) = displaced {
            debug!(key, id = old.id(), "Cancelling displaced renewal task");
            old.stop();
        }
    }

    /// Remove the entry for `key` and signal its task.
    ///
    /// Returns whether an entry was found.
    pub fn cancel_and_remove(&self, key: &str) -> bool {
        let removed = self.entries.lock().remove(key);

        match removed {
            Some(handle) => {
                debug!(key, id = handle.id(), "Cancelling renewal task");
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Remove the entry for `key` only if it still belongs to generation `id`.
    ///
    /// Called by a renewal task that ends on its own; it must not evict a
    /// newer task registered for the same key.
    pub fn remove_if_current(&self, key: &str, id: u64) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|handle| handle.id() == id) {
            entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Whether an entry exists for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    /// Whether `key` has an entry whose task is still running
    pub fn is_active(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Cancel and remove every entry, returning how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(String, RenewalHandle)> = self.entries.lock().drain().collect();
        let count = drained.len();

        for (key, handle) in drained {
            debug!(key, id = handle.id(), "Cancelling renewal task on shutdown");
            handle.stop();
        }

        count
    }
}
