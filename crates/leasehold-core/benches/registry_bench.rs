// Benchmarks for the lock lifecycle hot path
// Measures acquire/release round trips and registry churn against the in-memory store

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use leasehold_core::{LockManager, LockOptions, MemoryLockStore, RenewalRegistry, RenewalTask};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn bench_acquire_release(c: &mut Criterion) {
    let rt = runtime();
    let store = Arc::new(MemoryLockStore::new());
    let manager = LockManager::with_store(store, LockOptions::default()).unwrap();

    c.bench_function("acquire_release_round_trip", |b| {
        b.to_async(&rt).iter(|| async {
            manager.try_acquire("bench-key", None).await.unwrap();
            black_box(manager.release("bench-key", None).await.unwrap());
        })
    });
}

fn bench_registry_churn(c: &mut Criterion) {
    let rt = runtime();
    let store = Arc::new(MemoryLockStore::new());
    let registry = Arc::new(RenewalRegistry::new());
    let options = LockOptions::default();

    c.bench_function("registry_register_cancel", |b| {
        b.iter(|| {
            let _guard = rt.enter();
            let handle = RenewalTask::new(
                "bench-key",
                store.clone(),
                &registry,
                options.lease_ttl(),
                options.renewal_interval(),
                options.execute_timeout(),
            )
            .spawn();
            registry.register("bench-key", handle);
            black_box(registry.cancel_and_remove("bench-key"));
        })
    });
}

criterion_group!(benches, bench_acquire_release, bench_registry_churn);
criterion_main!(benches);
