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

//! Send triggers: when to ask the dispatcher for a flush.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use vigil_core::{CountListener, FlushRequest, SendTrigger};

/// Configuration of an [`IntervalTrigger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntervalTriggerConfig {
    /// Time between two flush requests, in milliseconds.
    pub interval_ms: u64,
}

impl Default for IntervalTriggerConfig {
    fn default() -> Self {
        Self { interval_ms: 5000 }
    }
}

/// Requests a flush at a fixed interval from its own thread.
pub struct IntervalTrigger {
    interval: Duration,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl IntervalTrigger {
    /// Creates a stopped trigger.
    pub fn new(config: &IntervalTriggerConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms.max(1)),
            stop_tx: None,
            handle: None,
        }
    }

    fn run(interval: Duration, stop_rx: Receiver<()>, flush: Arc<dyn FlushRequest>) {
        loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => flush.request_flush(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }
}

impl SendTrigger for IntervalTrigger {
    fn name(&self) -> &str {
        "interval"
    }

    fn start(&mut self, flush: Arc<dyn FlushRequest>) {
        if self.handle.is_some() {
            log::warn!("Interval trigger already running.");
            return;
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let interval = self.interval;
        match thread::Builder::new()
            .name("vigil-interval-trigger".to_string())
            .spawn(move || Self::run(interval, stop_rx, flush))
        {
            Ok(handle) => {
                self.stop_tx = Some(stop_tx);
                self.handle = Some(handle);
                log::debug!("Interval trigger running every {:?}.", interval);
            }
            Err(err) => log::error!("Could not start interval trigger: {err}"),
        }
    }

    fn stop(&mut self) {
        // Dropping the sender disconnects the channel and ends the loop.
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for IntervalTrigger {
    fn drop(&mut self) {
        self.stop();
    }
}

struct CountState {
    threshold: usize,
    flush: Mutex<Option<Arc<dyn FlushRequest>>>,
}

impl CountListener for CountState {
    fn content_changed(&self, pending: usize) {
        if pending < self.threshold {
            return;
        }
        if let Some(flush) = self.flush.lock().as_ref() {
            flush.request_flush();
        }
    }
}

/// Requests a flush as soon as the store holds `threshold` pending elements.
///
/// The trigger only sees the pending count if its [`listener`](Self::listener)
/// is registered with the record store.
#[derive(Clone)]
pub struct PendingCountTrigger {
    state: Arc<CountState>,
}

impl PendingCountTrigger {
    /// Creates a stopped trigger. A threshold of zero is treated as one.
    pub fn new(threshold: usize) -> Self {
        Self {
            state: Arc::new(CountState {
                threshold: threshold.max(1),
                flush: Mutex::new(None),
            }),
        }
    }

    /// The listener to register with the record store.
    pub fn listener(&self) -> Arc<dyn CountListener> {
        self.state.clone()
    }
}

impl SendTrigger for PendingCountTrigger {
    fn name(&self) -> &str {
        "pending-count"
    }

    fn start(&mut self, flush: Arc<dyn FlushRequest>) {
        *self.state.flush.lock() = Some(flush);
    }

    fn stop(&mut self) {
        self.state.flush.lock().take();
    }
}
