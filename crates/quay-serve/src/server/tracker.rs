// Copyright (c) 2025 Quay contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Live-connection tracker.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

// ----------------------------------------------------------------------------
// Structs
// ----------------------------------------------------------------------------

/// Live-connection tracker.
///
/// The tracker counts connections that were accepted, but whose handler has
/// not finished yet. Every accepted connection obtains exactly one [`Ticket`],
/// and dropping the ticket ends the connection's lifetime. Since tickets are
/// dropped during unwinding as well, a panicking handler is still accounted
/// for. The last ticket to be dropped wakes up everybody waiting for the
/// tracker to become idle.
#[derive(Debug, Default)]
pub struct Tracker {
    /// Number of live connections.
    live: AtomicUsize,
    /// Lock to pair with the condition variable.
    lock: Mutex<()>,
    /// Condition variable signalled when idle.
    idle: Condvar,
}

/// Ticket of a live connection.
#[derive(Debug)]
pub struct Ticket {
    /// Tracker the ticket was obtained from.
    tracker: Arc<Tracker>,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Tracker {
    /// Registers a live connection, returning its ticket.
    pub fn enter(self: &Arc<Self>) -> Ticket {
        self.live.fetch_add(1, Ordering::AcqRel);
        Ticket { tracker: Arc::clone(self) }
    }

    /// Returns the number of live connections.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Blocks until there are no live connections.
    pub fn wait(&self) {
        let mut guard =
            self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while self.live() > 0 {
            guard = self
                .idle
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks until there are no live connections or the timeout elapses,
    /// returning whether the tracker became idle.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard =
            self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while self.live() > 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = self
                .idle
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Drop for Ticket {
    /// Ends the lifetime of the connection.
    ///
    /// The lock is acquired before notifying, so a waiter that observed a
    /// positive count is guaranteed to be waiting when the signal is sent.
    fn drop(&mut self) {
        let tracker = &self.tracker;
        if tracker.live.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard =
                tracker.lock.lock().unwrap_or_else(PoisonError::into_inner);
            tracker.idle.notify_all();
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
