// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Process-private mutex.
// Delegates to platform::PlatformMutex (POSIX or Windows).

use std::io;

use crate::platform::PlatformMutex;

/// A process-private mutex with a stable address.
///
/// On POSIX this is a heap-boxed `pthread_mutex_t`; on Windows a heap-boxed
/// `CRITICAL_SECTION`. This is the *outer mutex* of [`FrwLock`]: the caller
/// owns it, may protect unrelated state with it, and must hold it around
/// every frwlock operation. Condition variables wait against it by raw
/// pointer, which is why it is a first-class type rather than
/// `std::sync::Mutex`.
///
/// [`FrwLock`]: crate::FrwLock
pub struct Mutex {
    inner: PlatformMutex,
}

impl Mutex {
    /// Create a new unlocked mutex.
    pub fn new() -> io::Result<Self> {
        let inner = PlatformMutex::new()?;
        Ok(Self { inner })
    }

    /// Lock the mutex (blocking, infinite timeout).
    pub fn lock(&self) -> io::Result<()> {
        self.inner.lock()
    }

    /// Lock the mutex with a timeout.
    /// Returns `Ok(true)` if the lock was acquired within `timeout_ms`
    /// milliseconds, `Ok(false)` on timeout.
    pub fn lock_timeout(&self, timeout_ms: u64) -> io::Result<bool> {
        self.inner.lock_timeout(timeout_ms)
    }

    /// Try to lock the mutex without blocking.
    /// Returns `Ok(true)` if the lock was acquired, `Ok(false)` if contended.
    pub fn try_lock(&self) -> io::Result<bool> {
        self.inner.try_lock()
    }

    /// Unlock the mutex.
    ///
    /// Unlocking a mutex the calling thread does not hold is a contract
    /// violation; the result is platform-defined.
    pub fn unlock(&self) -> io::Result<()> {
        self.inner.unlock()
    }

    /// The underlying platform mutex, used internally by `Condvar` waits.
    pub(crate) fn platform(&self) -> &PlatformMutex {
        &self.inner
    }
}
