// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX implementation of the process-private mutex and condition variable.
// pthread_mutex_t / pthread_cond_t with default (process-private) attributes,
// heap-boxed because pthread objects are address-sensitive once initialised.

use std::cell::UnsafeCell;
use std::io;

#[cfg(target_os = "macos")]
use crate::platform::adaptive_yield;

// ---------------------------------------------------------------------------
// PlatformMutex — pthread_mutex_t
// ---------------------------------------------------------------------------

pub struct PlatformMutex {
    // Boxed: pthread stores internal pointers relative to the address given
    // to pthread_mutex_init, so the object must never move afterwards.
    inner: Box<UnsafeCell<libc::pthread_mutex_t>>,
}

// Safety: pthread mutexes are made for concurrent access from any thread.
unsafe impl Send for PlatformMutex {}
unsafe impl Sync for PlatformMutex {}

impl PlatformMutex {
    /// Allocate and initialise a process-private mutex.
    pub fn new() -> io::Result<Self> {
        let inner: Box<UnsafeCell<libc::pthread_mutex_t>> =
            Box::new(UnsafeCell::new(unsafe { std::mem::zeroed() }));
        unsafe {
            let mut attr: libc::pthread_mutexattr_t = std::mem::zeroed();
            let mut eno = libc::pthread_mutexattr_init(&mut attr);
            if eno != 0 {
                return Err(io::Error::from_raw_os_error(eno));
            }
            eno = libc::pthread_mutex_init(inner.get(), &attr);
            libc::pthread_mutexattr_destroy(&mut attr);
            if eno != 0 {
                return Err(io::Error::from_raw_os_error(eno));
            }
        }
        Ok(Self { inner })
    }

    fn mtx_ptr(&self) -> *mut libc::pthread_mutex_t {
        self.inner.get()
    }

    /// Lock the mutex (blocking).
    pub fn lock(&self) -> io::Result<()> {
        let eno = unsafe { libc::pthread_mutex_lock(self.mtx_ptr()) };
        if eno != 0 {
            return Err(io::Error::from_raw_os_error(eno));
        }
        Ok(())
    }

    /// Lock the mutex with a timeout in milliseconds.
    /// Returns `Ok(true)` if acquired, `Ok(false)` on timeout.
    pub fn lock_timeout(&self, timeout_ms: u64) -> io::Result<bool> {
        #[cfg(target_os = "macos")]
        {
            // macOS lacks pthread_mutex_timedlock — emulate via try_lock polling.
            let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
            let mut k = 0u32;
            loop {
                let eno = unsafe { libc::pthread_mutex_trylock(self.mtx_ptr()) };
                match eno {
                    0 => return Ok(true),
                    libc::EBUSY => {}
                    _ => return Err(io::Error::from_raw_os_error(eno)),
                }
                if std::time::Instant::now() >= deadline {
                    return Ok(false);
                }
                adaptive_yield(&mut k);
            }
        }
        #[cfg(not(target_os = "macos"))]
        {
            extern "C" {
                fn pthread_mutex_timedlock(
                    mutex: *mut libc::pthread_mutex_t,
                    abstime: *const libc::timespec,
                ) -> libc::c_int;
            }
            let ts = abs_deadline(timeout_ms);
            loop {
                let eno = unsafe { pthread_mutex_timedlock(self.mtx_ptr(), &ts) };
                match eno {
                    0 => return Ok(true),
                    libc::ETIMEDOUT => return Ok(false),
                    libc::EINTR => continue,
                    _ => return Err(io::Error::from_raw_os_error(eno)),
                }
            }
        }
    }

    /// Try to lock the mutex without blocking.
    pub fn try_lock(&self) -> io::Result<bool> {
        let eno = unsafe { libc::pthread_mutex_trylock(self.mtx_ptr()) };
        match eno {
            0 => Ok(true),
            libc::EBUSY => Ok(false),
            _ => Err(io::Error::from_raw_os_error(eno)),
        }
    }

    /// Unlock the mutex.
    pub fn unlock(&self) -> io::Result<()> {
        let eno = unsafe { libc::pthread_mutex_unlock(self.mtx_ptr()) };
        if eno != 0 {
            return Err(io::Error::from_raw_os_error(eno));
        }
        Ok(())
    }

    /// Raw pointer to the underlying `pthread_mutex_t`, for condvar waits.
    pub(crate) fn native_ptr(&self) -> *mut u8 {
        self.mtx_ptr() as *mut u8
    }
}

impl Drop for PlatformMutex {
    fn drop(&mut self) {
        // Private allocation, never remapped — destroy is safe here.
        unsafe { libc::pthread_mutex_destroy(self.mtx_ptr()) };
    }
}

// ---------------------------------------------------------------------------
// PlatformCondvar — pthread_cond_t
// ---------------------------------------------------------------------------

pub struct PlatformCondvar {
    inner: Box<UnsafeCell<libc::pthread_cond_t>>,
}

unsafe impl Send for PlatformCondvar {}
unsafe impl Sync for PlatformCondvar {}

impl PlatformCondvar {
    /// Allocate and initialise a process-private condition variable.
    pub fn new() -> io::Result<Self> {
        let inner: Box<UnsafeCell<libc::pthread_cond_t>> =
            Box::new(UnsafeCell::new(unsafe { std::mem::zeroed() }));
        unsafe {
            let mut attr: libc::pthread_condattr_t = std::mem::zeroed();
            let mut eno = libc::pthread_condattr_init(&mut attr);
            if eno != 0 {
                return Err(io::Error::from_raw_os_error(eno));
            }
            eno = libc::pthread_cond_init(inner.get(), &attr);
            libc::pthread_condattr_destroy(&mut attr);
            if eno != 0 {
                return Err(io::Error::from_raw_os_error(eno));
            }
        }
        Ok(Self { inner })
    }

    fn cond_ptr(&self) -> *mut libc::pthread_cond_t {
        self.inner.get()
    }

    /// Wait on the condition variable. The caller must hold `mtx` locked;
    /// it is atomically released and re-acquired around the wait.
    pub fn wait(&self, mtx: &PlatformMutex) -> io::Result<()> {
        let mtx_ptr = mtx.native_ptr() as *mut libc::pthread_mutex_t;
        let eno = unsafe { libc::pthread_cond_wait(self.cond_ptr(), mtx_ptr) };
        if eno != 0 {
            return Err(io::Error::from_raw_os_error(eno));
        }
        Ok(())
    }

    /// Wait with a timeout in milliseconds.
    /// Returns `Ok(true)` if signalled, `Ok(false)` on timeout.
    pub fn wait_timeout(&self, mtx: &PlatformMutex, timeout_ms: u64) -> io::Result<bool> {
        let mtx_ptr = mtx.native_ptr() as *mut libc::pthread_mutex_t;
        let ts = abs_deadline(timeout_ms);
        let eno = unsafe { libc::pthread_cond_timedwait(self.cond_ptr(), mtx_ptr, &ts) };
        match eno {
            0 => Ok(true),
            libc::ETIMEDOUT => Ok(false),
            _ => Err(io::Error::from_raw_os_error(eno)),
        }
    }

    /// Wake one waiter.
    pub fn signal(&self) -> io::Result<()> {
        let eno = unsafe { libc::pthread_cond_signal(self.cond_ptr()) };
        if eno != 0 {
            return Err(io::Error::from_raw_os_error(eno));
        }
        Ok(())
    }

    /// Wake all waiters.
    pub fn broadcast(&self) -> io::Result<()> {
        let eno = unsafe { libc::pthread_cond_broadcast(self.cond_ptr()) };
        if eno != 0 {
            return Err(io::Error::from_raw_os_error(eno));
        }
        Ok(())
    }
}

impl Drop for PlatformCondvar {
    fn drop(&mut self) {
        // Destroying with waiters still blocked is a caller contract
        // violation (the frwlock requires quiescence before teardown).
        unsafe { libc::pthread_cond_destroy(self.cond_ptr()) };
    }
}

/// Absolute CLOCK_REALTIME deadline `timeout_ms` from now.
fn abs_deadline(timeout_ms: u64) -> libc::timespec {
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
    let ns_total = ts.tv_nsec as u64 + (timeout_ms % 1000) * 1_000_000;
    ts.tv_sec += (timeout_ms / 1000) as libc::time_t + (ns_total / 1_000_000_000) as libc::time_t;
    ts.tv_nsec = (ns_total % 1_000_000_000) as libc::c_long;
    ts
}
