// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Lock acquisition benchmarks.
//
// Run with:
//   cargo bench --bench contention
//
// Groups:
//   read_cycle   — read acquire/release, frwlock vs std::sync::RwLock
//   write_cycle  — write acquire/release, frwlock vs std::sync::RwLock
//   predicates   — the expense predicates a page cache calls before latching
//
// The frwlock numbers include taking and releasing the outer mutex, since
// that is what a real caller pays per operation.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use frwlock::{FrwLock, Mutex, ScopedLock};

fn new_lock() -> (Arc<Mutex>, FrwLock) {
    let outer = Arc::new(Mutex::new().unwrap());
    let lock = FrwLock::new(Arc::clone(&outer)).unwrap();
    (outer, lock)
}

fn bench_read_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_cycle");

    group.bench_function("frwlock", |b| {
        let (outer, lock) = new_lock();
        b.iter(|| {
            let _guard = ScopedLock::new(&outer).unwrap();
            lock.read_lock().unwrap();
            black_box(lock.readers());
            lock.read_unlock().unwrap();
        });
    });

    group.bench_function("std_rwlock", |b| {
        let lock = std::sync::RwLock::new(0u64);
        b.iter(|| {
            let guard = lock.read().unwrap();
            black_box(*guard);
        });
    });

    group.finish();
}

fn bench_write_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_cycle");

    group.bench_function("frwlock", |b| {
        let (outer, lock) = new_lock();
        b.iter(|| {
            let _guard = ScopedLock::new(&outer).unwrap();
            lock.write_lock(false).unwrap();
            black_box(lock.writers());
            lock.write_unlock().unwrap();
        });
    });

    group.bench_function("frwlock_expensive", |b| {
        let (outer, lock) = new_lock();
        b.iter(|| {
            let _guard = ScopedLock::new(&outer).unwrap();
            lock.write_lock(true).unwrap();
            black_box(lock.write_lock_is_expensive());
            lock.write_unlock().unwrap();
        });
    });

    group.bench_function("std_rwlock", |b| {
        let lock = std::sync::RwLock::new(0u64);
        b.iter(|| {
            let mut guard = lock.write().unwrap();
            *guard += 1;
            black_box(*guard);
        });
    });

    group.finish();
}

fn bench_predicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("predicates");

    group.bench_function("idle", |b| {
        let (outer, lock) = new_lock();
        b.iter(|| {
            let _guard = ScopedLock::new(&outer).unwrap();
            black_box(lock.write_lock_is_expensive());
            black_box(lock.read_lock_is_expensive());
        });
    });

    group.bench_function("under_expensive_writer", |b| {
        let (outer, lock) = new_lock();
        outer.lock().unwrap();
        lock.write_lock(true).unwrap();
        outer.unlock().unwrap();
        b.iter(|| {
            let _guard = ScopedLock::new(&outer).unwrap();
            black_box(lock.write_lock_is_expensive());
            black_box(lock.read_lock_is_expensive());
        });
        outer.lock().unwrap();
        lock.write_unlock().unwrap();
        outer.unlock().unwrap();
    });

    group.finish();
}

criterion_group!(benches, bench_read_cycle, bench_write_cycle, bench_predicates);
criterion_main!(benches);
