//! Lock lifecycle tests
//!
//! Several `LockManager`s sharing one `MemoryLockStore` stand in for
//! distinct processes coordinating through one store.

use std::sync::Arc;
use std::time::Duration;

use leasehold_core::{LockManager, LockOptions, Locker, MemoryLockStore};

const LEASE_TTL: Duration = Duration::from_secs(10);
const TICK: Duration = Duration::from_secs(1);

fn process(store: &Arc<MemoryLockStore>) -> LockManager {
    LockManager::with_store(store.clone(), LockOptions::default()).unwrap()
}

// ==================== Mutual exclusion ====================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_try_lock_has_single_winner() {
    let store = Arc::new(MemoryLockStore::new());
    let managers: Vec<Arc<LockManager>> = (0..16).map(|_| Arc::new(process(&store))).collect();

    let attempts = managers.iter().map(|manager| {
        let manager = manager.clone();
        tokio::spawn(async move { manager.try_lock("shared-resource", None).await })
    });
    let results = futures::future::join_all(attempts).await;

    let winners = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
    assert_eq!(winners, 1);

    let renewing: usize = managers.iter().map(|m| m.renewing_count()).sum();
    assert_eq!(renewing, 1);
}

#[tokio::test(start_paused = true)]
async fn test_double_acquire_rejected() {
    let store = Arc::new(MemoryLockStore::new());
    let first = process(&store);
    let second = process(&store);

    assert!(first.try_lock("k", None).await);
    assert!(!first.try_lock("k", None).await);
    assert!(!second.try_lock("k", None).await);

    // Still rejected well past the initial TTL
    tokio::time::sleep(LEASE_TTL * 2).await;
    assert!(!second.try_lock("k", None).await);
}

// ==================== Renewal ====================

#[tokio::test(start_paused = true)]
async fn test_renewal_keeps_lease_alive_until_unlock() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = process(&store);

    assert!(manager.try_lock("k", None).await);
    tokio::time::sleep(LEASE_TTL + LEASE_TTL / 2).await;
    assert!(store.contains("k"));
    assert!(manager.is_renewing("k"));

    assert!(manager.unlock("k", None).await);
    assert!(!store.contains("k"));
    assert!(!manager.is_renewing("k"));
}

#[tokio::test(start_paused = true)]
async fn test_lease_expires_after_renewal_failure() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = process(&store);
    assert!(manager.try_lock("k", None).await);

    // Renewed at t=1,2,3; the record now lives until t=13
    tokio::time::sleep(Duration::from_millis(3500)).await;
    store.set_available(false);

    // The tick at t=4 fails and the task stops
    tokio::time::sleep(TICK).await;
    assert!(!manager.is_renewing("k"));
    assert_eq!(manager.renewing_count(), 0);

    store.set_available(true);
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(store.contains("k"));
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!store.contains("k"));

    // Nothing left to delete, and the key is free again
    assert!(!manager.unlock("k", None).await);
    assert!(manager.try_lock("k", None).await);
}

#[tokio::test(start_paused = true)]
async fn test_crashed_holder_lease_expires() {
    let store = Arc::new(MemoryLockStore::new());
    let holder = process(&store);
    let waiter = process(&store);

    assert!(holder.try_lock("k", None).await);
    drop(holder);

    tokio::time::sleep(LEASE_TTL / 2).await;
    assert!(!waiter.try_lock("k", None).await);

    tokio::time::sleep(LEASE_TTL).await;
    assert!(waiter.try_lock("k", None).await);
}

// ==================== Release ====================

#[tokio::test(start_paused = true)]
async fn test_unlock_unheld_key_is_noop() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = process(&store);

    assert!(!manager.unlock("never-held", None).await);
    assert_eq!(manager.renewing_count(), 0);
    assert!(store.is_empty());

    assert!(manager.try_lock("never-held", None).await);
}

#[tokio::test(start_paused = true)]
async fn test_unlock_twice_is_safe() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = process(&store);
    assert!(manager.try_lock("k", None).await);

    let (a, b) = tokio::join!(manager.unlock("k", None), manager.unlock("k", None));
    assert!(a ^ b);
    assert!(!manager.unlock("k", None).await);
    assert_eq!(manager.renewing_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_round_trip() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = process(&store);
    let other = process(&store);

    assert!(manager.try_lock("k", None).await);
    assert!(manager.unlock("k", None).await);
    assert!(manager.try_lock("k", None).await);
    assert!(manager.unlock("k", None).await);

    // Released keys are open to other processes too
    assert!(other.try_lock("k", None).await);
}

#[tokio::test(start_paused = true)]
async fn test_unlock_by_other_process_stops_nothing_local() {
    let store = Arc::new(MemoryLockStore::new());
    let holder = process(&store);
    let other = process(&store);
    assert!(holder.try_lock("k", None).await);

    // No ownership check: any process may delete the record
    assert!(other.unlock("k", None).await);
    assert!(holder.is_renewing("k"));

    // The holder's next tick finds the record gone and stops
    tokio::time::sleep(TICK + Duration::from_millis(100)).await;
    assert!(!holder.is_renewing("k"));
}

#[tokio::test(start_paused = true)]
async fn test_independent_keys() {
    let store = Arc::new(MemoryLockStore::new());
    let manager = process(&store);

    for i in 0..8 {
        assert!(manager.try_lock(&format!("key-{}", i), None).await);
    }
    assert_eq!(manager.renewing_count(), 8);
    assert_eq!(store.len(), 8);

    assert!(manager.unlock("key-3", None).await);
    assert_eq!(manager.renewing_count(), 7);
    assert!(store.contains("key-4"));
}

#[tokio::test(start_paused = true)]
async fn test_custom_timings() {
    let store = Arc::new(MemoryLockStore::new());
    let options = LockOptions::default()
        .with_lease_ttl(Duration::from_secs(2))
        .with_renewal_interval(Duration::from_millis(500));
    let manager = LockManager::with_store(store.clone(), options).unwrap();

    assert!(manager.try_lock("k", Some(Duration::from_millis(100))).await);
    assert_eq!(store.remaining_ttl("k"), Some(Duration::from_secs(2)));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(store.contains("k"));
}
