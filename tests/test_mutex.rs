// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use frwlock::{Mutex, ScopedLock};

#[test]
fn basic_lock_unlock() {
    let mtx = Mutex::new().expect("new");
    mtx.lock().expect("lock");
    mtx.unlock().expect("unlock");
}

#[test]
fn multiple_lock_cycles() {
    let mtx = Mutex::new().expect("new");
    for _ in 0..100 {
        mtx.lock().expect("lock");
        mtx.unlock().expect("unlock");
    }
}

#[test]
fn try_lock_uncontended() {
    let mtx = Mutex::new().expect("new");
    assert!(mtx.try_lock().expect("try_lock"));
    mtx.unlock().expect("unlock");
}

#[test]
fn try_lock_contended() {
    let mtx = Arc::new(Mutex::new().expect("new"));
    mtx.lock().expect("lock");

    let mtx2 = Arc::clone(&mtx);
    let t = thread::spawn(move || mtx2.try_lock().expect("try_lock"));
    assert!(!t.join().unwrap(), "try_lock should fail while held");

    mtx.unlock().expect("unlock");
}

#[test]
fn lock_timeout_expires() {
    let mtx = Arc::new(Mutex::new().expect("new"));
    mtx.lock().expect("lock");

    let mtx2 = Arc::clone(&mtx);
    let t = thread::spawn(move || {
        let start = Instant::now();
        let got = mtx2.lock_timeout(100).expect("lock_timeout");
        (got, start.elapsed())
    });
    let (got, elapsed) = t.join().unwrap();
    assert!(!got, "should time out while held elsewhere");
    assert!(
        elapsed.as_millis() >= 80,
        "should have waited ~100ms, got {}ms",
        elapsed.as_millis()
    );

    mtx.unlock().expect("unlock");
}

#[test]
fn lock_timeout_succeeds() {
    let mtx = Mutex::new().expect("new");
    assert!(mtx.lock_timeout(100).expect("lock_timeout"));
    mtx.unlock().expect("unlock");
}

#[test]
fn mutual_exclusion() {
    let mtx = Arc::new(Mutex::new().expect("new"));
    let in_cs = Arc::new(AtomicBool::new(false));
    let violation = Arc::new(AtomicBool::new(false));
    let counter = Arc::new(AtomicI32::new(0));
    let iterations = 200;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let mtx = Arc::clone(&mtx);
            let in_cs = Arc::clone(&in_cs);
            let violation = Arc::clone(&violation);
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..iterations {
                    mtx.lock().expect("lock");
                    if in_cs.swap(true, Ordering::SeqCst) {
                        violation.store(true, Ordering::SeqCst);
                    }
                    counter.fetch_add(1, Ordering::Relaxed);
                    in_cs.store(false, Ordering::SeqCst);
                    mtx.unlock().expect("unlock");
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert!(!violation.load(Ordering::SeqCst));
    assert_eq!(counter.load(Ordering::Relaxed), iterations * 4);
}

#[test]
fn scoped_lock_guards() {
    let mtx = Mutex::new().expect("new");
    {
        let _guard = ScopedLock::new(&mtx).expect("scoped lock");
        assert!(!mtx.try_lock().expect("try_lock"), "guard holds the mutex");
    }
    // Guard dropped — lockable again.
    assert!(mtx.try_lock().expect("try_lock"));
    mtx.unlock().expect("unlock");
}

#[test]
fn scoped_lock_serialises() {
    let mtx = Arc::new(Mutex::new().expect("new"));
    let data = Arc::new(AtomicI32::new(0));

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let mtx = Arc::clone(&mtx);
            let data = Arc::clone(&data);
            thread::spawn(move || {
                for _ in 0..100 {
                    let _guard = ScopedLock::new(&mtx).expect("scoped lock");
                    let v = data.load(Ordering::Relaxed);
                    thread::yield_now();
                    data.store(v + 1, Ordering::Relaxed);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(data.load(Ordering::Relaxed), 200);
}

#[test]
fn contended_handoff() {
    let mtx = Arc::new(Mutex::new().expect("new"));
    mtx.lock().expect("lock");

    let mtx2 = Arc::clone(&mtx);
    let acquired = Arc::new(AtomicBool::new(false));
    let acquired2 = Arc::clone(&acquired);
    let t = thread::spawn(move || {
        mtx2.lock().expect("lock");
        acquired2.store(true, Ordering::SeqCst);
        mtx2.unlock().expect("unlock");
    });

    thread::sleep(Duration::from_millis(50));
    assert!(!acquired.load(Ordering::SeqCst), "blocked while we hold it");

    mtx.unlock().expect("unlock");
    t.join().unwrap();
    assert!(acquired.load(Ordering::SeqCst));
}
