// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Intrusive FIFO of lock waiters.
// Writer entries live on the waiting writer's stack for the duration of its
// blocking call; the single reader-group entry is owned by the FrwLock.
// Every link and flag is read or written only while the outer mutex is held,
// so plain Cells suffice — no atomics.

use std::cell::Cell;
use std::ptr;

use crate::Condvar;

/// One waiter in the queue: either a single writer or the reader group.
pub(crate) struct WaitEntry {
    next: Cell<*const WaitEntry>,
    // Writer entries point at the condvar in the waiter's stack frame.
    // Null for the reader-group entry; the FrwLock broadcasts its own
    // reader condvar for that one.
    cond: *const Condvar,
    // Set by the wakeup protocol before the signal. The woken writer
    // re-checks it in a loop, so spurious wakeups are harmless.
    granted: Cell<bool>,
    is_reader_group: bool,
}

impl WaitEntry {
    /// Entry for a single waiting writer, referencing its stack condvar.
    pub(crate) fn for_writer(cond: &Condvar) -> Self {
        Self {
            next: Cell::new(ptr::null()),
            cond,
            granted: Cell::new(false),
            is_reader_group: false,
        }
    }

    /// The distinguished reader-group entry.
    pub(crate) fn reader_group() -> Self {
        Self {
            next: Cell::new(ptr::null()),
            cond: ptr::null(),
            granted: Cell::new(false),
            is_reader_group: true,
        }
    }

    pub(crate) fn is_reader_group(&self) -> bool {
        self.is_reader_group
    }

    pub(crate) fn granted(&self) -> bool {
        self.granted.get()
    }

    pub(crate) fn set_granted(&self) {
        self.granted.set(true);
    }

    /// The writer's condition variable.
    ///
    /// # Safety
    /// Only valid for writer entries, and only while the owning writer is
    /// still blocked inside its acquisition call (the pointer targets that
    /// call's stack frame).
    pub(crate) unsafe fn writer_cond(&self) -> &Condvar {
        debug_assert!(!self.is_reader_group);
        &*self.cond
    }
}

/// Singly-linked FIFO. Holds at most one reader-group entry at a time;
/// writer entries are unique per waiting writer.
pub(crate) struct WaitQueue {
    head: Cell<*const WaitEntry>,
    tail: Cell<*const WaitEntry>,
}

impl WaitQueue {
    pub(crate) fn new() -> Self {
        Self {
            head: Cell::new(ptr::null()),
            tail: Cell::new(ptr::null()),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.get().is_null()
    }

    /// Append `entry` at the tail.
    ///
    /// # Safety
    /// The caller must hold the outer mutex, and `entry` must stay valid and
    /// pinned until it is popped again.
    pub(crate) unsafe fn push(&self, entry: *const WaitEntry) {
        (*entry).next.set(ptr::null());
        let tail = self.tail.get();
        if tail.is_null() {
            self.head.set(entry);
        } else {
            (*tail).next.set(entry);
        }
        self.tail.set(entry);
    }

    /// Remove and return the head entry, or null if the queue is empty.
    ///
    /// # Safety
    /// The caller must hold the outer mutex.
    pub(crate) unsafe fn pop(&self) -> *const WaitEntry {
        let head = self.head.get();
        if head.is_null() {
            return head;
        }
        let next = (*head).next.get();
        self.head.set(next);
        if next.is_null() {
            self.tail.set(ptr::null());
        }
        (*head).next.set(ptr::null());
        head
    }

    /// Whether `entry` is currently linked into the queue.
    ///
    /// # Safety
    /// The caller must hold the outer mutex. O(n); invariant checking only.
    #[cfg(debug_assertions)]
    pub(crate) unsafe fn contains(&self, entry: *const WaitEntry) -> bool {
        let mut cur = self.head.get();
        while !cur.is_null() {
            if cur == entry {
                return true;
            }
            cur = (*cur).next.get();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let c1 = Condvar::new().unwrap();
        let c2 = Condvar::new().unwrap();
        let q = WaitQueue::new();
        assert!(q.is_empty());

        let e1 = WaitEntry::for_writer(&c1);
        let e2 = WaitEntry::for_writer(&c2);
        let group = WaitEntry::reader_group();
        unsafe {
            q.push(&e1);
            q.push(&group);
            q.push(&e2);

            assert!(!q.is_empty());
            assert!(std::ptr::eq(q.pop(), &e1));
            let head = q.pop();
            assert!(std::ptr::eq(head, &group));
            assert!((*head).is_reader_group());
            assert!(std::ptr::eq(q.pop(), &e2));
        }
        assert!(q.is_empty());
        assert!(unsafe { q.pop() }.is_null());
    }

    #[test]
    fn reuse_after_drain() {
        let c = Condvar::new().unwrap();
        let q = WaitQueue::new();
        let e = WaitEntry::for_writer(&c);
        unsafe {
            q.push(&e);
            assert!(std::ptr::eq(q.pop(), &e));
            // The same entry may be queued again after being popped.
            q.push(&e);
            assert!(!q.is_empty());
            assert!(std::ptr::eq(q.pop(), &e));
        }
        assert!(q.is_empty());
    }

    #[test]
    fn granted_flag() {
        let c = Condvar::new().unwrap();
        let e = WaitEntry::for_writer(&c);
        assert!(!e.granted());
        e.set_granted();
        assert!(e.granted());
    }
}
