// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Active/processing role exchange over a fixed pair of buffers.

use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks which slot of a buffer pair producers write to.
///
/// Producers announce themselves in the slot they are about to write with
/// [`RoleExchange::enter`], which never blocks. The single swapper flips the
/// active slot with one atomic `fetch_xor` and then waits until every writer
/// that entered the old slot has left, after which the old slot is private to
/// the swapper.
#[derive(Debug, Default)]
pub(crate) struct RoleExchange {
    active: AtomicUsize,
    writers: [CachePadded<AtomicUsize>; 2],
    // Parks the swapper once backing off no longer pays.
    quiet: Mutex<()>,
    retired_quiet: Condvar,
}

/// A producer's registration in the active slot. Leaves on drop.
pub(crate) struct WriterGuard<'a> {
    exchange: &'a RoleExchange,
    slot: usize,
}

impl WriterGuard<'_> {
    pub(crate) fn slot(&self) -> usize {
        self.slot
    }
}

impl Drop for WriterGuard<'_> {
    fn drop(&mut self) {
        self.exchange.leave(self.slot);
    }
}

impl RoleExchange {
    /// Index of the slot producers currently write to.
    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Registers the caller as a writer of the active slot.
    pub(crate) fn enter(&self) -> WriterGuard<'_> {
        loop {
            let slot = self.active.load(Ordering::SeqCst);
            self.writers[slot].fetch_add(1, Ordering::SeqCst);
            // A swap between the load and the increment would let us write
            // into the slot being drained; back out and retry on the new one.
            if self.active.load(Ordering::SeqCst) == slot {
                return WriterGuard {
                    exchange: self,
                    slot,
                };
            }
            self.leave(slot);
        }
    }

    fn leave(&self, slot: usize) {
        let last = self.writers[slot].fetch_sub(1, Ordering::SeqCst) == 1;
        // Either this load sees the flip or the swapper sees the count at zero.
        if last && self.active.load(Ordering::SeqCst) != slot {
            let _quiet = self.quiet.lock();
            self.retired_quiet.notify_all();
        }
    }

    /// Makes the other slot active and returns the previously active one once
    /// no producer is writing to it anymore.
    ///
    /// Must not be called concurrently with itself.
    pub(crate) fn exchange(&self) -> usize {
        let retired = self.active.fetch_xor(1, Ordering::SeqCst);
        let backoff = Backoff::new();
        while self.writers[retired].load(Ordering::SeqCst) != 0 {
            if backoff.is_completed() {
                let mut quiet = self.quiet.lock();
                while self.writers[retired].load(Ordering::SeqCst) != 0 {
                    self.retired_quiet.wait(&mut quiet);
                }
                break;
            }
            backoff.snooze();
        }
        retired
    }
}
