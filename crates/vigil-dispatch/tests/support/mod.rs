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

//! Hand-written collaborator fakes shared by the dispatch integration tests.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use vigil_core::{
    BatchBuffer, ConnectivityMonitor, FlushRequest, Record, Registration, SendTrigger, Transport,
    TransportError,
};

/// Polls `condition` for up to five seconds.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// FIFO batch buffer that counts every call the core makes.
#[derive(Default)]
pub struct RecordingBuffer {
    batches: Mutex<VecDeque<Vec<Record>>>,
    pub accepted: AtomicUsize,
    pub requeued: AtomicUsize,
}

impl RecordingBuffer {
    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }
}

impl BatchBuffer for RecordingBuffer {
    fn accept(&self, batch: Vec<Record>) {
        self.accepted.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().push_back(batch);
    }

    fn has_ready(&self) -> bool {
        !self.batches.lock().is_empty()
    }

    fn take_next(&self) -> Option<Vec<Record>> {
        self.batches.lock().pop_front()
    }

    fn requeue(&self, batch: Vec<Record>) {
        self.requeued.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().push_front(batch);
    }
}

/// Transport that records sent batches and can be told to fail.
pub struct RecordingTransport {
    connectivity: ConnectivityMonitor,
    unreachable: AtomicBool,
    pub attempts: AtomicUsize,
    pub sent: Mutex<Vec<Vec<Record>>>,
}

impl RecordingTransport {
    pub fn new(connected: bool) -> Self {
        Self {
            connectivity: ConnectivityMonitor::new(connected),
            unreachable: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Makes every following send fail with `ServerUnreachable`.
    pub fn fail_unreachable(&self) {
        self.unreachable.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.unreachable.store(false, Ordering::SeqCst);
    }

    pub fn sent_records(&self) -> Vec<Record> {
        self.sent.lock().iter().flatten().cloned().collect()
    }
}

impl Transport for RecordingTransport {
    fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    fn send(&self, batch: &[Record]) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::ServerUnreachable { timeout: false });
        }
        self.sent.lock().push(batch.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRegistration {
    pub retired: AtomicUsize,
}

impl Registration for RecordingRegistration {
    fn retire(&self) {
        self.retired.fetch_add(1, Ordering::SeqCst);
    }
}

/// Trigger that only flushes when the test tells it to.
#[derive(Clone, Default)]
pub struct ManualTrigger {
    handle: Arc<Mutex<Option<Arc<dyn FlushRequest>>>>,
    pub stopped: Arc<AtomicBool>,
}

impl ManualTrigger {
    pub fn fire(&self) -> bool {
        match self.handle.lock().as_ref() {
            Some(handle) => {
                handle.request_flush();
                true
            }
            None => false,
        }
    }
}

impl SendTrigger for ManualTrigger {
    fn name(&self) -> &str {
        "manual"
    }

    fn start(&mut self, flush: Arc<dyn FlushRequest>) {
        *self.handle.lock() = Some(flush);
    }

    fn stop(&mut self) {
        self.handle.lock().take();
        self.stopped.store(true, Ordering::SeqCst);
    }
}
