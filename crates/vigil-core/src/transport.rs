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

//! Transport and registration contracts, plus the connectivity monitor the
//! sending worker waits on.

use crate::error::TransportError;
use crate::record::Record;
use parking_lot::{Condvar, Mutex};

/// Ships batches to the remote collector.
///
/// The dispatch engine only reacts to the binary connected/disconnected state
/// exposed through [`Transport::connectivity`]; detecting reconnection is the
/// transport's job.
pub trait Transport: Send + Sync {
    /// The monitor tracking this transport's connectivity.
    fn connectivity(&self) -> &ConnectivityMonitor;

    /// Returns `true` if batches can currently be sent.
    fn is_connected(&self) -> bool {
        self.connectivity().is_connected()
    }

    /// Sends one batch.
    fn send(&self, batch: &[Record]) -> Result<(), TransportError>;
}

/// Told once, at final shutdown, that this agent instance is retiring.
pub trait Registration: Send + Sync {
    /// Unregisters the agent from the collector.
    fn retire(&self);
}

/// Connected/disconnected flag guarded by the same lock its waiters sleep on.
///
/// A transport flips the flag with [`ConnectivityMonitor::set_connected`];
/// becoming connected wakes every waiter. Waiters re-check both the flag and
/// their own interruption condition under the lock, so neither a reconnection
/// nor an interruption can slip between the check and the wait.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    connected: Mutex<bool>,
    changed: Condvar,
}

impl ConnectivityMonitor {
    /// Creates a monitor in the given initial state.
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Mutex::new(connected),
            changed: Condvar::new(),
        }
    }

    /// Returns the current state.
    pub fn is_connected(&self) -> bool {
        *self.connected.lock()
    }

    /// Updates the state, waking waiters on a transition to connected.
    pub fn set_connected(&self, connected: bool) {
        let mut state = self.connected.lock();
        let reconnected = connected && !*state;
        *state = connected;
        if reconnected {
            log::info!("Connection to collector re-established.");
            self.changed.notify_all();
        }
    }

    /// Wakes every waiter without changing the state.
    ///
    /// Callers set their interruption condition first; waiters observe it
    /// when they re-check under the lock.
    pub fn wake_all(&self) {
        let _state = self.connected.lock();
        self.changed.notify_all();
    }

    /// Blocks until connected or until `interrupted` returns `true`.
    ///
    /// Returns `true` if the transport is connected.
    pub fn wait_for_connection(&self, interrupted: impl Fn() -> bool) -> bool {
        let mut state = self.connected.lock();
        loop {
            if interrupted() {
                return false;
            }
            if *state {
                return true;
            }
            self.changed.wait(&mut state);
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn waiter_released_on_reconnect() {
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let waiter = {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || monitor.wait_for_connection(|| false))
        };

        thread::sleep(Duration::from_millis(20));
        monitor.set_connected(true);

        assert!(waiter.join().expect("waiter panicked"));
    }

    #[test]
    fn waiter_released_on_interrupt() {
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let stop = Arc::new(AtomicBool::new(false));
        let waiter = {
            let monitor = Arc::clone(&monitor);
            let stop = Arc::clone(&stop);
            thread::spawn(move || monitor.wait_for_connection(|| stop.load(Ordering::SeqCst)))
        };

        thread::sleep(Duration::from_millis(20));
        stop.store(true, Ordering::SeqCst);
        monitor.wake_all();

        assert!(!waiter.join().expect("waiter panicked"));
        assert!(!monitor.is_connected());
    }

    #[test]
    fn connected_monitor_does_not_block() {
        let monitor = ConnectivityMonitor::default();
        assert!(monitor.wait_for_connection(|| false));
    }
}
