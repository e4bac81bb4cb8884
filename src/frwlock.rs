// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Fair reader/writer lock with expensive-operation awareness.
//
// The lock is bound to a caller-owned outer mutex; every operation requires
// that mutex to be held, and the blocking paths release it only inside
// condition-variable waits. Writers queue FIFO, each behind its own stack
// condvar; waiting readers batch into a single queue entry and are woken by
// one broadcast, so a burst of reads costs one generation of wakeups and an
// unbounded stream of readers can never starve a queued writer.

use std::cell::UnsafeCell;
use std::io;
use std::sync::Arc;

use crate::wait_queue::{WaitEntry, WaitQueue};
use crate::{Condvar, Mutex};

/// Counter block. Guarded by the outer mutex; never read or written
/// without it.
#[derive(Default)]
struct State {
    /// Readers currently holding the lock.
    readers: usize,
    /// Writers currently holding the lock; 0 or 1.
    writers: usize,
    /// Readers waiting in the group, including broadcast-but-not-yet-resumed.
    want_read: usize,
    /// Writers waiting in the queue.
    want_write: usize,
    /// Queued writers that declared themselves expensive.
    expensive_want_write: usize,
    /// Readers broadcast-woken but not yet resumed. While nonzero, the
    /// write fast path is refused so a fresh writer cannot jump past them.
    signalled_readers: usize,
    /// The current writer declared itself expensive. False whenever
    /// `writers == 0`.
    current_writer_expensive: bool,
    /// The queued reader group sits behind an expensive writer, captured at
    /// the moment the group entered the queue.
    read_wait_expensive: bool,
    /// The reader-group entry is currently linked into the queue.
    reader_group_queued: bool,
    /// Bumped on every reader-group broadcast. Woken readers re-wait until
    /// the generation they joined has passed, which makes the wait immune
    /// to spurious wakeups and to signals meant for a later generation.
    read_generation: u64,
}

/// A fair reader/writer lock for page-cache latching.
///
/// Many readers or one writer; strict FIFO between writers and reader
/// *generations*. A `write_lock` caller declares up front whether its hold
/// will be expensive (I/O, decompression, large copies), and prospective
/// acquirers can ask [`write_lock_is_expensive`] / [`read_lock_is_expensive`]
/// whether acquiring now would park them behind such an operation — and go
/// do something better instead.
///
/// Every method requires the outer mutex (the one passed to [`FrwLock::new`])
/// to be held by the calling thread. The blocking acquisitions release it
/// inside their condition-variable waits and re-acquire it before returning.
///
/// Not reentrant: a holder that re-acquires deadlocks behind itself. No
/// upgrade path from reader to writer; drop and re-acquire instead.
///
/// [`write_lock_is_expensive`]: FrwLock::write_lock_is_expensive
/// [`read_lock_is_expensive`]: FrwLock::read_lock_is_expensive
pub struct FrwLock {
    outer: Arc<Mutex>,
    state: UnsafeCell<State>,
    queue: WaitQueue,
    /// Shared by every reader of a waiting generation; one broadcast wakes
    /// them all.
    reader_cond: Condvar,
    /// The distinguished queue entry for the reader group, owned here and
    /// linked into `queue` at most once at a time.
    reader_entry: WaitEntry,
}

// Safety: all mutable state is guarded by the outer mutex, which every
// operation requires the caller to hold.
unsafe impl Send for FrwLock {}
unsafe impl Sync for FrwLock {}

impl FrwLock {
    /// Bind a new, quiescent lock to `outer`. The lock never locks or
    /// unlocks `outer` itself; it only releases it inside condvar waits.
    pub fn new(outer: Arc<Mutex>) -> io::Result<Self> {
        Ok(Self {
            outer,
            state: UnsafeCell::new(State::default()),
            queue: WaitQueue::new(),
            reader_cond: Condvar::new()?,
            reader_entry: WaitEntry::reader_group(),
        })
    }

    /// The outer mutex this lock is bound to.
    pub fn outer_mutex(&self) -> &Mutex {
        &self.outer
    }

    /// Mutable view of the counter block.
    ///
    /// # Safety
    /// The outer mutex must be held, and the returned borrow must end before
    /// this is called again (each call re-derives from the cell).
    #[allow(clippy::mut_from_ref)]
    unsafe fn state(&self) -> &mut State {
        &mut *self.state.get()
    }

    // -----------------------------------------------------------------------
    // Write side
    // -----------------------------------------------------------------------

    /// Acquire the write lock, blocking until granted. `expensive` declares
    /// that the hold will take long (I/O, decompression, a large copy) and
    /// is surfaced to other threads through the expense predicates.
    pub fn write_lock(&self, expensive: bool) -> io::Result<()> {
        {
            let s = unsafe { self.state() };
            if s.readers == 0 && s.writers == 0 && s.signalled_readers == 0 && s.want_write == 0 {
                debug_assert!(!s.reader_group_queued && s.want_read == 0);
                s.writers = 1;
                s.current_writer_expensive = expensive;
                self.debug_check();
                return Ok(());
            }
        }

        // Slow path: park behind a condvar that lives in this stack frame.
        // The entry is unlinked by the waker before the grant, so it never
        // outlives this call while queued.
        let cond = Condvar::new()?;
        let entry = WaitEntry::for_writer(&cond);
        {
            let s = unsafe { self.state() };
            unsafe { self.queue.push(&entry) };
            s.want_write += 1;
            if expensive {
                s.expensive_want_write += 1;
            }
        }

        while !entry.granted() {
            cond.wait(&self.outer)?;
        }

        // Woken by the grant: the waker popped our entry but left the
        // counters for us to update.
        let s = unsafe { self.state() };
        debug_assert!(s.readers == 0 && s.writers == 0 && s.signalled_readers == 0);
        s.want_write -= 1;
        if expensive {
            s.expensive_want_write -= 1;
        }
        s.writers = 1;
        s.current_writer_expensive = expensive;
        self.debug_check();
        Ok(())
    }

    /// Acquire the write lock only if that needs no waiting.
    /// Returns `Ok(false)` with no side effect otherwise.
    pub fn try_write_lock(&self, expensive: bool) -> io::Result<bool> {
        let s = unsafe { self.state() };
        if s.readers == 0 && s.writers == 0 && s.signalled_readers == 0 && s.want_write == 0 {
            s.writers = 1;
            s.current_writer_expensive = expensive;
            self.debug_check();
            return Ok(true);
        }
        Ok(false)
    }

    /// Release the write lock and wake the next waiter: the whole reader
    /// group if it is at the head of the queue, else one writer.
    pub fn write_unlock(&self) -> io::Result<()> {
        let s = unsafe { self.state() };
        assert_eq!(s.writers, 1, "write_unlock on a lock not held for write");
        s.writers = 0;
        s.current_writer_expensive = false;
        self.signal_or_broadcast_next(s)?;
        self.debug_check();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// Acquire a read lock, blocking until granted. If any writer holds or
    /// waits, the caller joins the reader group for the next generation.
    pub fn read_lock(&self) -> io::Result<()> {
        let my_generation;
        {
            let s = unsafe { self.state() };
            if s.writers == 0 && s.want_write == 0 {
                s.readers += 1;
                self.debug_check();
                return Ok(());
            }

            if !s.reader_group_queued {
                // The previous generation is fully signalled (or there was
                // none); every still-counted reader is on its way out of
                // the wait.
                debug_assert_eq!(s.signalled_readers, s.want_read);
                s.reader_group_queued = true;
                s.read_wait_expensive =
                    s.current_writer_expensive || s.expensive_want_write > 0;
                unsafe { self.queue.push(&self.reader_entry) };
            }
            s.want_read += 1;
            my_generation = s.read_generation;
        }

        loop {
            let s = unsafe { self.state() };
            if s.read_generation != my_generation {
                break;
            }
            self.reader_cond.wait(&self.outer)?;
        }

        let s = unsafe { self.state() };
        debug_assert!(s.writers == 0 && s.want_read > 0 && s.signalled_readers > 0);
        s.want_read -= 1;
        s.signalled_readers -= 1;
        s.readers += 1;
        self.debug_check();
        Ok(())
    }

    /// Acquire a read lock only if that needs no waiting.
    /// Returns `Ok(false)` with no side effect otherwise.
    pub fn try_read_lock(&self) -> io::Result<bool> {
        let s = unsafe { self.state() };
        if s.writers == 0 && s.want_write == 0 {
            s.readers += 1;
            self.debug_check();
            return Ok(true);
        }
        Ok(false)
    }

    /// Release a read lock. The last reader out wakes the next queued
    /// writer, if any.
    pub fn read_unlock(&self) -> io::Result<()> {
        let s = unsafe { self.state() };
        assert!(
            s.writers == 0 && s.readers > 0,
            "read_unlock on a lock not held for read"
        );
        s.readers -= 1;
        if s.readers == 0 {
            self.signal_next_writer(s)?;
        }
        self.debug_check();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Wakeup protocol
    // -----------------------------------------------------------------------

    /// Called when the last reader leaves. Grants the head writer, if one is
    /// queued and no signalled readers are still resuming. Deliberately does
    /// not consider the reader group: promoting it past a queued writer here
    /// would break the FIFO ordering guarantee.
    fn signal_next_writer(&self, s: &mut State) -> io::Result<()> {
        if s.want_write > 0 && s.signalled_readers == 0 && s.readers == 0 {
            let entry = unsafe { self.queue.pop() };
            debug_assert!(!entry.is_null());
            // A queued reader group always sits behind the writers that
            // forced it to queue, so the head must be a writer here.
            let entry = unsafe { &*entry };
            assert!(!entry.is_reader_group(), "reader group ahead of queued writer");
            entry.set_granted();
            // Safety: the owning writer is still blocked in write_lock, so
            // its stack condvar is alive.
            unsafe { entry.writer_cond() }.signal()?;
        }
        Ok(())
    }

    /// Called on write unlock. Dequeues the head entry and wakes it: a
    /// broadcast for the whole reader group, a single signal for a writer.
    fn signal_or_broadcast_next(&self, s: &mut State) -> io::Result<()> {
        debug_assert_eq!(s.signalled_readers, 0);
        if self.queue.is_empty() {
            debug_assert!(s.want_read == 0 && s.want_write == 0);
            return Ok(());
        }
        let entry = unsafe { &*self.queue.pop() };
        if entry.is_reader_group() {
            debug_assert!(s.reader_group_queued && s.want_read > 0);
            s.signalled_readers = s.want_read;
            s.reader_group_queued = false;
            s.read_wait_expensive = false;
            s.read_generation += 1;
            self.reader_cond.broadcast()?;
        } else {
            debug_assert!(s.want_write > 0);
            entry.set_granted();
            // Safety: see signal_next_writer.
            unsafe { entry.writer_cond() }.signal()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Introspection — constant-time reads of the counter block.
    // The outer mutex must be held for all of these.
    // -----------------------------------------------------------------------

    /// Holders plus waiters, both sides.
    pub fn users(&self) -> usize {
        let s = unsafe { &*self.state.get() };
        s.readers + s.writers + s.want_read + s.want_write
    }

    /// Waiters, both sides.
    pub fn blocked_users(&self) -> usize {
        let s = unsafe { &*self.state.get() };
        s.want_read + s.want_write
    }

    /// Readers currently holding the lock.
    pub fn readers(&self) -> usize {
        unsafe { &*self.state.get() }.readers
    }

    /// Readers waiting (or signalled but not yet resumed).
    pub fn blocked_readers(&self) -> usize {
        unsafe { &*self.state.get() }.want_read
    }

    /// Writers currently holding the lock; 0 or 1.
    pub fn writers(&self) -> usize {
        unsafe { &*self.state.get() }.writers
    }

    /// Writers waiting in the queue.
    pub fn blocked_writers(&self) -> usize {
        unsafe { &*self.state.get() }.want_write
    }

    /// Would a `write_lock` call now wait behind an expensive operation?
    /// True while any queued writer is expensive or the current writer is.
    pub fn write_lock_is_expensive(&self) -> bool {
        let s = unsafe { &*self.state.get() };
        s.expensive_want_write > 0 || s.current_writer_expensive
    }

    /// Would a `read_lock` call now wait behind an expensive operation?
    ///
    /// Once the reader group is queued, the answer is pinned to the expense
    /// state captured when the group entered the queue: expensive writers
    /// arriving later queue *behind* the group and do not lengthen its wait.
    pub fn read_lock_is_expensive(&self) -> bool {
        let s = unsafe { &*self.state.get() };
        if s.reader_group_queued {
            s.read_wait_expensive
        } else {
            s.current_writer_expensive || s.expensive_want_write > 0
        }
    }

    // -----------------------------------------------------------------------

    /// Structural invariants, checked at the end of every public operation
    /// in debug builds.
    #[inline]
    fn debug_check(&self) {
        #[cfg(debug_assertions)]
        {
            let s = unsafe { &*self.state.get() };
            debug_assert!(s.writers <= 1);
            debug_assert!(s.readers == 0 || s.writers == 0);
            debug_assert!(s.signalled_readers <= s.want_read);
            debug_assert!(s.expensive_want_write <= s.want_write);
            debug_assert!(s.writers == 1 || !s.current_writer_expensive);
            debug_assert!(s.reader_group_queued || !s.read_wait_expensive);
            debug_assert_eq!(s.reader_group_queued, unsafe {
                self.queue.contains(&self.reader_entry)
            });
        }
    }
}

impl Drop for FrwLock {
    fn drop(&mut self) {
        // Tearing down a non-quiescent lock is a contract violation; safe
        // callers cannot reach it anyway, since every waiter blocks inside
        // a call that borrows the lock.
        let s = self.state.get_mut();
        debug_assert!(
            s.readers == 0
                && s.writers == 0
                && s.want_read == 0
                && s.want_write == 0
                && self.queue.is_empty(),
            "frwlock dropped while in use"
        );
    }
}
