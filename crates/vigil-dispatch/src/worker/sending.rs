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

//! Sending worker: drains the batch buffer into the transport.

use super::state::{SendingState, StateCell};
use crate::signal::{Signal, Wake};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vigil_core::{BatchBuffer, Transport, TransportError};

/// Why a transmit cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CycleEnd {
    /// The buffer reported nothing more ready.
    Drained,
    /// The transport reported itself disconnected.
    Disconnected,
    /// A send failed; the batch went back to the buffer.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Timeout,
    Unreachable,
    Rejected,
    Other,
    Panic,
}

impl FailureKind {
    fn of(err: &TransportError) -> Self {
        match err {
            TransportError::ServerUnreachable { timeout: true } => Self::Timeout,
            TransportError::ServerUnreachable { timeout: false } => Self::Unreachable,
            TransportError::Rejected(_) => Self::Rejected,
            TransportError::Other(_) => Self::Other,
        }
    }
}

/// Moves ready batches from the buffer to the transport.
///
/// Keeps the kind of the last failure so a streak of identical failures is
/// reported once. Timeouts are always reported, at warning level.
#[derive(Debug, Default)]
pub(crate) struct Transmitter {
    last_failure: Option<FailureKind>,
}

impl Transmitter {
    pub(crate) fn transmit_ready(
        &mut self,
        buffer: &dyn BatchBuffer,
        transport: &dyn Transport,
    ) -> CycleEnd {
        let mut sent = 0usize;
        let end = loop {
            if !buffer.has_ready() {
                break CycleEnd::Drained;
            }
            if !transport.is_connected() {
                break CycleEnd::Disconnected;
            }
            let Some(batch) = buffer.take_next() else {
                break CycleEnd::Drained;
            };

            match catch_unwind(AssertUnwindSafe(|| transport.send(&batch))) {
                Ok(Ok(())) => {
                    if self.last_failure.take().is_some() {
                        log::info!("Sending to the collector recovered.");
                    }
                    sent += 1;
                }
                Ok(Err(err)) => {
                    self.report(FailureKind::of(&err), &err.to_string());
                    buffer.requeue(batch);
                    break CycleEnd::Failed;
                }
                Err(_) => {
                    self.report(FailureKind::Panic, "transport panicked during send");
                    buffer.requeue(batch);
                    break CycleEnd::Failed;
                }
            }
        };

        if sent > 0 {
            log::debug!("Sent {sent} batches ({end:?}).");
        }
        end
    }

    fn report(&mut self, kind: FailureKind, detail: &str) {
        if kind == FailureKind::Timeout {
            log::warn!("Sending aborted, data kept for the next attempt: {detail}.");
        } else if self.last_failure != Some(kind) {
            log::error!("Sending aborted, data kept for the next attempt: {detail}.");
        } else {
            log::trace!("Sending still failing: {detail}.");
        }
        self.last_failure = Some(kind);
    }
}

pub(crate) struct SendingWorker {
    pub(crate) buffer: Arc<dyn BatchBuffer>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) data_ready: Arc<Signal>,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) state: Arc<StateCell<SendingState>>,
}

impl SendingWorker {
    pub(crate) fn run(self) {
        log::info!("Sending worker started.");
        let mut transmitter = Transmitter::default();
        let mut failed = false;

        loop {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            // A failure followed by a disconnect waits on reconnection instead.
            if failed && !self.transport.is_connected() {
                failed = false;
            }

            if failed || !self.buffer.has_ready() {
                self.state.set(SendingState::Idle);
                match self.data_ready.wait() {
                    Wake::Raised => {
                        failed = false;
                        continue;
                    }
                    Wake::Closed | Wake::TimedOut => break,
                }
            }

            if !self.transport.is_connected() {
                self.state.set(SendingState::WaitingConnection);
                let stop = &self.stop;
                if !self
                    .transport
                    .connectivity()
                    .wait_for_connection(|| stop.load(Ordering::SeqCst))
                {
                    break;
                }
                continue;
            }

            self.state.set(SendingState::Sending);
            failed = transmitter.transmit_ready(self.buffer.as_ref(), self.transport.as_ref())
                == CycleEnd::Failed;
        }

        self.state.set(SendingState::Stopped);
        log::info!("Sending worker stopped.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::{Duration, Instant};
    use vigil_core::{ConnectivityMonitor, Record, SystemData};

    #[derive(Default)]
    struct QueueBuffer {
        batches: Mutex<VecDeque<Vec<Record>>>,
        requeued: AtomicUsize,
    }

    impl BatchBuffer for QueueBuffer {
        fn accept(&self, batch: Vec<Record>) {
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

    /// Fails the first `failures` sends with the given error, then succeeds.
    struct ScriptedTransport {
        connectivity: ConnectivityMonitor,
        failures: AtomicUsize,
        timeout: bool,
        sent: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(connected: bool, failures: usize, timeout: bool) -> Self {
            Self {
                connectivity: ConnectivityMonitor::new(connected),
                failures: AtomicUsize::new(failures),
                timeout,
                sent: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn connectivity(&self) -> &ConnectivityMonitor {
            &self.connectivity
        }

        fn send(&self, _batch: &[Record]) -> Result<(), TransportError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(TransportError::ServerUnreachable {
                    timeout: self.timeout,
                });
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct PanickingTransport(ConnectivityMonitor);

    impl Transport for PanickingTransport {
        fn connectivity(&self) -> &ConnectivityMonitor {
            &self.0
        }

        fn send(&self, _batch: &[Record]) -> Result<(), TransportError> {
            panic!("malformed payload");
        }
    }

    fn batch() -> Vec<Record> {
        vec![Record::System(SystemData::new(1))]
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn drains_every_ready_batch() {
        let buffer = QueueBuffer::default();
        let transport = ScriptedTransport::new(true, 0, false);
        for _ in 0..3 {
            buffer.accept(batch());
        }

        let end = Transmitter::default().transmit_ready(&buffer, &transport);
        assert_eq!(end, CycleEnd::Drained);
        assert_eq!(transport.sent.load(Ordering::SeqCst), 3);
        assert!(!buffer.has_ready());
    }

    #[test]
    fn disconnected_transport_keeps_data() {
        let buffer = QueueBuffer::default();
        let transport = ScriptedTransport::new(false, 0, false);
        buffer.accept(batch());

        let end = Transmitter::default().transmit_ready(&buffer, &transport);
        assert_eq!(end, CycleEnd::Disconnected);
        assert!(buffer.has_ready());
    }

    #[test]
    fn failed_send_requeues_and_tracks_streak() {
        let buffer = QueueBuffer::default();
        let transport = ScriptedTransport::new(true, 2, false);
        buffer.accept(batch());
        let mut transmitter = Transmitter::default();

        assert_eq!(transmitter.transmit_ready(&buffer, &transport), CycleEnd::Failed);
        assert_eq!(transmitter.last_failure, Some(FailureKind::Unreachable));
        assert_eq!(transmitter.transmit_ready(&buffer, &transport), CycleEnd::Failed);
        assert_eq!(buffer.requeued.load(Ordering::SeqCst), 2);

        assert_eq!(transmitter.transmit_ready(&buffer, &transport), CycleEnd::Drained);
        assert_eq!(transmitter.last_failure, None);
        assert_eq!(transport.sent.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timeout_is_classified_apart() {
        let buffer = QueueBuffer::default();
        let transport = ScriptedTransport::new(true, 1, true);
        buffer.accept(batch());
        let mut transmitter = Transmitter::default();

        assert_eq!(transmitter.transmit_ready(&buffer, &transport), CycleEnd::Failed);
        assert_eq!(transmitter.last_failure, Some(FailureKind::Timeout));
    }

    #[test]
    fn failure_kinds_follow_error_variants() {
        let timeout = TransportError::ServerUnreachable { timeout: true };
        let rejected = TransportError::Rejected("payload too large".to_string());
        let other = TransportError::Other(anyhow::anyhow!("broken pipe"));

        assert_eq!(FailureKind::of(&timeout), FailureKind::Timeout);
        assert_eq!(FailureKind::of(&rejected), FailureKind::Rejected);
        assert_eq!(FailureKind::of(&other), FailureKind::Other);
    }

    #[test]
    fn panicking_transport_is_contained() {
        let buffer = QueueBuffer::default();
        let transport = PanickingTransport(ConnectivityMonitor::new(true));
        buffer.accept(batch());
        let mut transmitter = Transmitter::default();

        assert_eq!(transmitter.transmit_ready(&buffer, &transport), CycleEnd::Failed);
        assert_eq!(transmitter.last_failure, Some(FailureKind::Panic));
        assert!(buffer.has_ready());
    }

    #[test]
    fn worker_waits_for_connection_then_sends() {
        let buffer = Arc::new(QueueBuffer::default());
        let transport = Arc::new(ScriptedTransport::new(false, 0, false));
        let data_ready = Arc::new(Signal::new());
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::new(StateCell::new(SendingState::Idle));

        let worker = SendingWorker {
            buffer: buffer.clone(),
            transport: transport.clone(),
            data_ready: Arc::clone(&data_ready),
            stop: Arc::clone(&stop),
            state: Arc::clone(&state),
        };
        let handle = thread::spawn(move || worker.run());

        buffer.accept(batch());
        data_ready.raise();
        assert!(wait_until(|| state.get() == SendingState::WaitingConnection));

        transport.connectivity().set_connected(true);
        assert!(wait_until(|| transport.sent.load(Ordering::SeqCst) == 1));
        assert!(wait_until(|| state.get() == SendingState::Idle));

        stop.store(true, Ordering::SeqCst);
        data_ready.close();
        transport.connectivity().wake_all();
        handle.join().expect("worker panicked");
        assert_eq!(state.get(), SendingState::Stopped);
    }

    #[test]
    fn stop_interrupts_connection_wait() {
        let buffer = Arc::new(QueueBuffer::default());
        let transport = Arc::new(ScriptedTransport::new(false, 0, false));
        let data_ready = Arc::new(Signal::new());
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::new(StateCell::new(SendingState::Idle));
        buffer.accept(batch());

        let worker = SendingWorker {
            buffer: buffer.clone(),
            transport: transport.clone(),
            data_ready: Arc::clone(&data_ready),
            stop: Arc::clone(&stop),
            state: Arc::clone(&state),
        };
        let handle = thread::spawn(move || worker.run());
        assert!(wait_until(|| state.get() == SendingState::WaitingConnection));

        stop.store(true, Ordering::SeqCst);
        data_ready.close();
        transport.connectivity().wake_all();
        handle.join().expect("worker panicked");

        assert_eq!(state.get(), SendingState::Stopped);
        assert!(buffer.has_ready());
    }
}
