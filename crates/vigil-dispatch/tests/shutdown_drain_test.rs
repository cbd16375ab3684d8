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

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use support::{ManualTrigger, RecordingBuffer, RecordingRegistration, RecordingTransport};
use vigil_core::{
    BatchBuffer, ExceptionData, ExceptionEvent, Record, RecordSink, SystemData, Transport,
};
use vigil_dispatch::{Dispatcher, DispatcherConfig, DrainOutcome, PreparationState};

fn exception(identity_hash: u64) -> ExceptionData {
    ExceptionData {
        sensor_type_id: 8,
        method_id: 2,
        identity_hash,
        timestamp_ms: 0,
        event: ExceptionEvent::Created,
        error_type: "NullPointerException".to_string(),
        message: None,
        stack_trace: None,
        child: None,
    }
}

#[test]
fn test_shutdown_sends_remaining_data_and_retires() {
    // --- 1. ARRANGE ---
    let buffer = Arc::new(RecordingBuffer::default());
    let transport = Arc::new(RecordingTransport::new(true));
    let registration = Arc::new(RecordingRegistration::default());
    let trigger = ManualTrigger::default();
    let dispatcher = Dispatcher::builder()
        .buffer(buffer.clone())
        .transport(transport.clone())
        .registration(registration.clone())
        .trigger(Box::new(trigger.clone()))
        .build()
        .unwrap();
    dispatcher.start().unwrap();

    // Never flushed by a trigger: only the final drain can pick these up.
    dispatcher.store().add_exception_record(exception(1));
    dispatcher
        .store()
        .add_platform_record(SystemData::new(4).with_value("memory.used.avg", 2048.0));

    // --- 2. ACT ---
    let outcome = dispatcher.shutdown();

    // --- 3. ASSERT ---
    assert_eq!(outcome, DrainOutcome::Completed);
    assert!(trigger.stopped.load(Ordering::SeqCst), "Triggers stop first");
    assert_eq!(transport.sent_records().len(), 2);
    assert_eq!(registration.retired.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.preparation_state(), PreparationState::Stopping);
}

#[test]
fn test_shutdown_while_disconnected_keeps_data() {
    let buffer = Arc::new(RecordingBuffer::default());
    let transport = Arc::new(RecordingTransport::new(false));
    let registration = Arc::new(RecordingRegistration::default());
    let dispatcher = Dispatcher::builder()
        .buffer(buffer.clone())
        .transport(transport.clone())
        .registration(registration.clone())
        .build()
        .unwrap();
    dispatcher.start().unwrap();
    dispatcher.store().add_exception_record(exception(1));

    assert_eq!(dispatcher.shutdown(), DrainOutcome::Completed);

    // Exactly one final prepare; the batch stays with the buffer.
    assert_eq!(buffer.accepted.load(Ordering::SeqCst), 1);
    assert!(buffer.has_ready());
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);
    assert_eq!(registration.retired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shutdown_swallows_unreachable_collector() {
    let buffer = Arc::new(RecordingBuffer::default());
    let transport = Arc::new(RecordingTransport::new(true));
    transport.fail_unreachable();
    let registration = Arc::new(RecordingRegistration::default());
    let dispatcher = Dispatcher::builder()
        .buffer(buffer.clone())
        .transport(transport.clone())
        .registration(registration.clone())
        .build()
        .unwrap();
    dispatcher.start().unwrap();
    dispatcher.store().add_exception_record(exception(1));
    dispatcher.store().add_exception_record(exception(2));

    assert_eq!(dispatcher.shutdown(), DrainOutcome::Completed);

    assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(buffer.requeued.load(Ordering::SeqCst), 1);
    assert_eq!(buffer.take_next().map(|b| b.len()), Some(2));
    assert_eq!(registration.retired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_second_shutdown_and_drop_are_no_ops() {
    let buffer = Arc::new(RecordingBuffer::default());
    let transport = Arc::new(RecordingTransport::new(true));
    let registration = Arc::new(RecordingRegistration::default());
    let dispatcher = Dispatcher::builder()
        .buffer(buffer.clone())
        .transport(transport.clone())
        .registration(registration.clone())
        .build()
        .unwrap();
    dispatcher.start().unwrap();

    assert_eq!(dispatcher.shutdown(), DrainOutcome::Completed);
    assert_eq!(dispatcher.shutdown(), DrainOutcome::AlreadyShutDown);
    drop(dispatcher);

    assert_eq!(registration.retired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_drop_runs_the_drain_once() {
    let buffer = Arc::new(RecordingBuffer::default());
    let transport = Arc::new(RecordingTransport::new(true));
    let registration = Arc::new(RecordingRegistration::default());
    {
        let dispatcher = Dispatcher::builder()
            .buffer(buffer.clone())
            .transport(transport.clone())
            .registration(registration.clone())
            .build()
            .unwrap();
        dispatcher.start().unwrap();
        dispatcher.store().add_exception_record(exception(3));
    }

    assert_eq!(registration.retired.load(Ordering::SeqCst), 1);
    assert_eq!(transport.sent_records().len(), 1);
}

#[test]
fn test_stuck_send_still_drains_and_retires_after_join_timeout() {
    // ARRANGE
    let buffer = Arc::new(RecordingBuffer::default());
    let transport = Arc::new(BlockingTransport::default());
    let registration = Arc::new(RecordingRegistration::default());
    let config = DispatcherConfig {
        shutdown_join_timeout_ms: 50,
        ..Default::default()
    };
    let dispatcher = Dispatcher::builder()
        .config(config)
        .buffer(buffer.clone())
        .transport(transport.clone())
        .registration(registration.clone())
        .build()
        .unwrap();
    dispatcher.start().unwrap();

    dispatcher.store().add_exception_record(exception(1));
    dispatcher.request_flush();
    assert!(support::wait_until(|| transport.entered.load(Ordering::SeqCst)));
    dispatcher.store().add_exception_record(exception(2));

    // ACT
    let outcome = dispatcher.shutdown();

    // ASSERT
    assert_eq!(outcome, DrainOutcome::CompletedAfterTimeout("sending"));
    assert!(dispatcher.store().is_empty());
    assert_eq!(buffer.accepted.load(Ordering::SeqCst), 2);
    assert_eq!(registration.retired.load(Ordering::SeqCst), 1);
    let drained = transport.delivered.lock().clone();
    assert_eq!(drained.len(), 1);
    assert!(matches!(&drained[0], Record::Exception(e) if e.identity_hash == 2));

    transport.release.store(true, Ordering::SeqCst);
}

/// Blocks inside the first `send` until released; later sends go through.
#[derive(Default)]
struct BlockingTransport {
    connectivity: vigil_core::ConnectivityMonitor,
    entered: std::sync::atomic::AtomicBool,
    release: std::sync::atomic::AtomicBool,
    delivered: parking_lot::Mutex<Vec<Record>>,
}

impl Transport for BlockingTransport {
    fn connectivity(&self) -> &vigil_core::ConnectivityMonitor {
        &self.connectivity
    }

    fn send(&self, batch: &[Record]) -> Result<(), vigil_core::TransportError> {
        if self.entered.swap(true, Ordering::SeqCst) {
            self.delivered.lock().extend_from_slice(batch);
            return Ok(());
        }
        while !self.release.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(5));
        }
        Ok(())
    }
}
