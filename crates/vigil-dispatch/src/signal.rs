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

//! Coalescing wake-up signal used between the workers.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Why a wait on a [`Signal`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The signal was raised. The raise has been consumed.
    Raised,
    /// The timeout elapsed without a raise.
    TimedOut,
    /// The signal was closed; the waiter should stop.
    Closed,
}

#[derive(Debug, Default)]
struct SignalState {
    raised: bool,
    closed: bool,
}

/// A single-slot "dirty" flag paired with a condition variable.
///
/// Raising an already-raised signal is a no-op, so any burst of raises while
/// the consumer is busy results in exactly one more wake-up. Closing wins over
/// a pending raise.
#[derive(Debug, Default)]
pub struct Signal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl Signal {
    /// Creates a lowered, open signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Returns `false` if it was already raised or closed.
    pub fn raise(&self) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.raised {
            return false;
        }
        state.raised = true;
        self.cond.notify_one();
        true
    }

    /// Closes the signal, releasing every current and future waiter.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.cond.notify_all();
    }

    /// Returns `true` once the signal has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Returns `true` if a raise is pending.
    pub fn is_raised(&self) -> bool {
        self.state.lock().raised
    }

    /// Blocks until the signal is raised or closed.
    pub fn wait(&self) -> Wake {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Wake::Closed;
            }
            if state.raised {
                state.raised = false;
                return Wake::Raised;
            }
            self.cond.wait(&mut state);
        }
    }

    /// Blocks until the signal is raised or closed, or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Wake {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Wake::Closed;
            }
            if state.raised {
                state.raised = false;
                return Wake::Raised;
            }
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                return if state.closed {
                    Wake::Closed
                } else if state.raised {
                    state.raised = false;
                    Wake::Raised
                } else {
                    Wake::TimedOut
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn repeated_raises_coalesce() {
        let signal = Signal::new();
        assert!(signal.raise());
        assert!(!signal.raise());
        assert!(!signal.raise());

        assert_eq!(signal.wait(), Wake::Raised);
        assert_eq!(signal.wait_timeout(Duration::from_millis(10)), Wake::TimedOut);
    }

    #[test]
    fn close_wins_over_pending_raise() {
        let signal = Signal::new();
        signal.raise();
        signal.close();

        assert_eq!(signal.wait(), Wake::Closed);
        assert!(!signal.raise());
    }

    #[test]
    fn close_releases_blocked_waiter() {
        let signal = Arc::new(Signal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait())
        };

        thread::sleep(Duration::from_millis(20));
        signal.close();

        assert_eq!(waiter.join().expect("waiter panicked"), Wake::Closed);
    }

    #[test]
    fn raise_from_other_thread_wakes_timed_waiter() {
        let signal = Arc::new(Signal::new());
        let raiser = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.raise();
            })
        };

        assert_eq!(signal.wait_timeout(Duration::from_secs(5)), Wake::Raised);
        raiser.join().expect("raiser panicked");
    }
}
