// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows implementation of the process-private mutex and condition variable.
// CRITICAL_SECTION + CONDITION_VARIABLE: a kernel named mutex cannot be used
// here because SleepConditionVariableCS pairs only with critical sections.

use std::cell::UnsafeCell;
use std::io;

use windows_sys::Win32::Foundation::{GetLastError, ERROR_TIMEOUT};
use windows_sys::Win32::System::Threading::{
    DeleteCriticalSection, EnterCriticalSection, InitializeConditionVariable,
    InitializeCriticalSection, LeaveCriticalSection, SleepConditionVariableCS,
    TryEnterCriticalSection, WakeAllConditionVariable, WakeConditionVariable,
    CONDITION_VARIABLE, CRITICAL_SECTION, INFINITE,
};

use crate::platform::adaptive_yield;

// ---------------------------------------------------------------------------
// PlatformMutex — CRITICAL_SECTION
// ---------------------------------------------------------------------------

pub struct PlatformMutex {
    // Boxed: a CRITICAL_SECTION must not move while in use.
    inner: Box<UnsafeCell<CRITICAL_SECTION>>,
}

unsafe impl Send for PlatformMutex {}
unsafe impl Sync for PlatformMutex {}

impl PlatformMutex {
    /// Allocate and initialise a process-private mutex.
    pub fn new() -> io::Result<Self> {
        let inner: Box<UnsafeCell<CRITICAL_SECTION>> =
            Box::new(UnsafeCell::new(unsafe { std::mem::zeroed() }));
        unsafe { InitializeCriticalSection(inner.get()) };
        Ok(Self { inner })
    }

    fn cs_ptr(&self) -> *mut CRITICAL_SECTION {
        self.inner.get()
    }

    /// Lock the mutex (blocking).
    pub fn lock(&self) -> io::Result<()> {
        unsafe { EnterCriticalSection(self.cs_ptr()) };
        Ok(())
    }

    /// Lock the mutex with a timeout in milliseconds.
    /// Critical sections have no timed acquire — emulate via try-enter polling.
    /// Returns `Ok(true)` if acquired, `Ok(false)` on timeout.
    pub fn lock_timeout(&self, timeout_ms: u64) -> io::Result<bool> {
        let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
        let mut k = 0u32;
        loop {
            if unsafe { TryEnterCriticalSection(self.cs_ptr()) } != 0 {
                return Ok(true);
            }
            if std::time::Instant::now() >= deadline {
                return Ok(false);
            }
            adaptive_yield(&mut k);
        }
    }

    /// Try to lock the mutex without blocking.
    pub fn try_lock(&self) -> io::Result<bool> {
        Ok(unsafe { TryEnterCriticalSection(self.cs_ptr()) } != 0)
    }

    /// Unlock the mutex.
    pub fn unlock(&self) -> io::Result<()> {
        unsafe { LeaveCriticalSection(self.cs_ptr()) };
        Ok(())
    }

    /// Raw pointer to the underlying `CRITICAL_SECTION`, for condvar waits.
    pub(crate) fn native_ptr(&self) -> *mut u8 {
        self.cs_ptr() as *mut u8
    }
}

impl Drop for PlatformMutex {
    fn drop(&mut self) {
        unsafe { DeleteCriticalSection(self.cs_ptr()) };
    }
}

// ---------------------------------------------------------------------------
// PlatformCondvar — CONDITION_VARIABLE
// ---------------------------------------------------------------------------

pub struct PlatformCondvar {
    inner: Box<UnsafeCell<CONDITION_VARIABLE>>,
}

unsafe impl Send for PlatformCondvar {}
unsafe impl Sync for PlatformCondvar {}

impl PlatformCondvar {
    /// Allocate and initialise a process-private condition variable.
    pub fn new() -> io::Result<Self> {
        let inner: Box<UnsafeCell<CONDITION_VARIABLE>> =
            Box::new(UnsafeCell::new(unsafe { std::mem::zeroed() }));
        unsafe { InitializeConditionVariable(inner.get()) };
        Ok(Self { inner })
    }

    fn cv_ptr(&self) -> *mut CONDITION_VARIABLE {
        self.inner.get()
    }

    /// Wait on the condition variable. The caller must hold `mtx` locked;
    /// it is atomically released and re-acquired around the wait.
    pub fn wait(&self, mtx: &PlatformMutex) -> io::Result<()> {
        let cs = mtx.native_ptr() as *mut CRITICAL_SECTION;
        if unsafe { SleepConditionVariableCS(self.cv_ptr(), cs, INFINITE) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Wait with a timeout in milliseconds.
    /// Returns `Ok(true)` if signalled, `Ok(false)` on timeout.
    pub fn wait_timeout(&self, mtx: &PlatformMutex, timeout_ms: u64) -> io::Result<bool> {
        let cs = mtx.native_ptr() as *mut CRITICAL_SECTION;
        let ms = timeout_ms.min(u32::MAX as u64 - 1) as u32;
        if unsafe { SleepConditionVariableCS(self.cv_ptr(), cs, ms) } == 0 {
            if unsafe { GetLastError() } == ERROR_TIMEOUT {
                return Ok(false);
            }
            return Err(io::Error::last_os_error());
        }
        Ok(true)
    }

    /// Wake one waiter.
    pub fn signal(&self) -> io::Result<()> {
        unsafe { WakeConditionVariable(self.cv_ptr()) };
        Ok(())
    }

    /// Wake all waiters.
    pub fn broadcast(&self) -> io::Result<()> {
        unsafe { WakeAllConditionVariable(self.cv_ptr()) };
        Ok(())
    }
}

impl Drop for PlatformCondvar {
    fn drop(&mut self) {
        // CONDITION_VARIABLE has no delete call; dropping with waiters still
        // blocked is a caller contract violation.
    }
}
