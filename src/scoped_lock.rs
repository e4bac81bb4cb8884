// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// RAII guard that holds a Mutex for the lifetime of the access.

use std::io;

use crate::Mutex;

/// RAII guard: locks the mutex on construction, unlocks on drop.
///
/// Convenience wrapper for callers that bracket frwlock operations with the
/// outer mutex and do not need to release it across a blocking acquisition.
pub struct ScopedLock<'a> {
    mtx: &'a Mutex,
}

impl<'a> ScopedLock<'a> {
    /// Create a new scoped lock guard. Locks `mtx` immediately.
    pub fn new(mtx: &'a Mutex) -> io::Result<Self> {
        mtx.lock()?;
        Ok(Self { mtx })
    }
}

impl<'a> Drop for ScopedLock<'a> {
    fn drop(&mut self) {
        let _ = self.mtx.unlock();
    }
}
