// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Fair reader/writer lock with expensive-operation awareness, plus the
// process-private mutex and condition variable it is built on. The lock is
// the page-latch primitive of a buffered-tree page cache: strict FIFO
// between writers and batched reader generations, with predicates that let
// a caller ask whether acquiring now would park it behind a long operation.

mod platform;

mod mutex;
pub use mutex::Mutex;

mod condvar;
pub use condvar::Condvar;

mod scoped_lock;
pub use scoped_lock::ScopedLock;

mod wait_queue;

mod frwlock;
pub use frwlock::FrwLock;
