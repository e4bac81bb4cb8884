// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Process-private condition variable.
// Delegates to platform::PlatformCondvar (POSIX or Windows).

use std::io;

use crate::platform::PlatformCondvar;
use crate::Mutex;

/// A process-private condition variable.
///
/// On POSIX this is a heap-boxed `pthread_cond_t`; on Windows a heap-boxed
/// `CONDITION_VARIABLE`. A condvar may be paired with only one mutex at a
/// time. Waits are subject to spurious wakeups: callers re-check their
/// predicate in a loop.
pub struct Condvar {
    inner: PlatformCondvar,
}

impl Condvar {
    /// Create a new condition variable with no waiters.
    pub fn new() -> io::Result<Self> {
        let inner = PlatformCondvar::new()?;
        Ok(Self { inner })
    }

    /// Wait on the condition variable. The caller must hold `mtx` locked;
    /// the mutex is atomically released and re-acquired around the wait.
    pub fn wait(&self, mtx: &Mutex) -> io::Result<()> {
        self.inner.wait(mtx.platform())
    }

    /// Wait with a timeout.
    /// Returns `Ok(true)` if signalled within `timeout_ms` milliseconds,
    /// `Ok(false)` on timeout.
    pub fn wait_timeout(&self, mtx: &Mutex, timeout_ms: u64) -> io::Result<bool> {
        self.inner.wait_timeout(mtx.platform(), timeout_ms)
    }

    /// Wake one waiter.
    pub fn signal(&self) -> io::Result<()> {
        self.inner.signal()
    }

    /// Wake all waiters.
    pub fn broadcast(&self) -> io::Result<()> {
        self.inner.broadcast()
    }
}
