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

//! Lifecycle of the dispatch engine: assembly, start and the shutdown drain.

use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::signal::Signal;
use crate::store::RecordStore;
use crate::worker::preparation::{prepare_batch, PreparationWorker};
use crate::worker::refresher::SensorRefresher;
use crate::worker::sending::{SendingWorker, Transmitter};
use crate::worker::state::{PreparationState, SendingState, StateCell};
use crate::worker::WorkerHandle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vigil_core::{
    BatchBuffer, EventSensor, FlushRequest, PlatformSensor, Registration, RecordSink,
    SendTrigger, Transport,
};

/// A cloneable handle that asks the preparation worker for a flush.
///
/// Handed to every [`SendTrigger`] on start. Requests made while a flush is
/// already pending coalesce into one.
#[derive(Debug, Clone)]
pub struct FlushHandle {
    flush: Arc<Signal>,
}

impl FlushRequest for FlushHandle {
    fn request_flush(&self) {
        if !self.flush.raise() {
            log::trace!("Flush already pending.");
        }
    }
}

/// How a call to [`Dispatcher::shutdown`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Workers stopped, the final drain ran and the agent retired.
    Completed,
    /// The named worker did not stop in time. It was left running detached;
    /// the final drain and the retirement still ran.
    CompletedAfterTimeout(&'static str),
    /// An earlier call already shut the dispatcher down.
    AlreadyShutDown,
}

/// Assembles a [`Dispatcher`] from its collaborators.
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    store: Option<Arc<RecordStore>>,
    transport: Option<Arc<dyn Transport>>,
    buffer: Option<Arc<dyn BatchBuffer>>,
    registration: Option<Arc<dyn Registration>>,
    triggers: Vec<Box<dyn SendTrigger>>,
    platform_sensors: Vec<Box<dyn PlatformSensor>>,
    event_sensors: Vec<Box<dyn EventSensor>>,
}

impl DispatcherBuilder {
    /// Starts a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: DispatcherConfig::default(),
            store: None,
            transport: None,
            buffer: None,
            registration: None,
            triggers: Vec::new(),
            platform_sensors: Vec::new(),
            event_sensors: Vec::new(),
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing record store instead of a fresh one.
    pub fn store(mut self, store: Arc<RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the transport. Required.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the batching collaborator. Required.
    pub fn buffer(mut self, buffer: Arc<dyn BatchBuffer>) -> Self {
        self.buffer = Some(buffer);
        self
    }

    /// Sets the collaborator notified when the agent retires.
    pub fn registration(mut self, registration: Arc<dyn Registration>) -> Self {
        self.registration = Some(registration);
        self
    }

    /// Adds a send trigger.
    pub fn trigger(mut self, trigger: Box<dyn SendTrigger>) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Adds a counted platform sensor.
    pub fn platform_sensor(mut self, sensor: Box<dyn PlatformSensor>) -> Self {
        self.platform_sensors.push(sensor);
        self
    }

    /// Adds an event-driven sensor.
    pub fn event_sensor(mut self, sensor: Box<dyn EventSensor>) -> Self {
        self.event_sensors.push(sensor);
        self
    }

    /// Validates the configuration and builds a stopped dispatcher.
    pub fn build(self) -> Result<Dispatcher, DispatchError> {
        self.config.validate()?;
        let transport = self
            .transport
            .ok_or(DispatchError::MissingCollaborator("transport"))?;
        let buffer = self
            .buffer
            .ok_or(DispatchError::MissingCollaborator("batch buffer"))?;
        let store = self.store.unwrap_or_default();

        let sink: Arc<dyn RecordSink> = store.clone();
        let mut refresher = SensorRefresher::new(sink, self.config.sensor_collect_iterations);
        for sensor in self.platform_sensors {
            refresher.add_platform_sensor(sensor);
        }
        for sensor in self.event_sensors {
            refresher.add_event_sensor(sensor);
        }

        Ok(Dispatcher {
            config: self.config,
            store,
            transport,
            buffer,
            registration: self.registration,
            triggers: Mutex::new(self.triggers),
            refresher: Mutex::new(Some(refresher)),
            workers: Mutex::new(Workers::default()),
            flush: Arc::new(Signal::new()),
            data_ready: Arc::new(Signal::new()),
            refresher_stop: Arc::new(Signal::new()),
            stop: Arc::new(AtomicBool::new(false)),
            preparation_state: Arc::new(StateCell::new(PreparationState::Waiting)),
            sending_state: Arc::new(StateCell::new(SendingState::Idle)),
            started: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        })
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

type SpawnFn<'a> = &'a dyn Fn(
    &DispatcherConfig,
    &'static str,
    Box<dyn FnOnce() + Send>,
) -> Result<WorkerHandle, DispatchError>;

#[derive(Debug, Default)]
struct Workers {
    preparation: Option<WorkerHandle>,
    sending: Option<WorkerHandle>,
    refresher: Option<WorkerHandle>,
}

/// Owns the background workers and the shutdown drain.
///
/// All methods take `&self`, so a dispatcher can be shared behind an `Arc`
/// between the host's main thread and its termination handler.
pub struct Dispatcher {
    config: DispatcherConfig,
    store: Arc<RecordStore>,
    transport: Arc<dyn Transport>,
    buffer: Arc<dyn BatchBuffer>,
    registration: Option<Arc<dyn Registration>>,
    triggers: Mutex<Vec<Box<dyn SendTrigger>>>,
    refresher: Mutex<Option<SensorRefresher>>,
    workers: Mutex<Workers>,
    flush: Arc<Signal>,
    data_ready: Arc<Signal>,
    refresher_stop: Arc<Signal>,
    stop: Arc<AtomicBool>,
    preparation_state: Arc<StateCell<PreparationState>>,
    sending_state: Arc<StateCell<SendingState>>,
    started: AtomicBool,
    shut_down: AtomicBool,
}

impl Dispatcher {
    /// Starts assembling a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// The store producers write into.
    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// The active configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// A handle for requesting flushes from outside the send triggers.
    pub fn flush_handle(&self) -> FlushHandle {
        FlushHandle {
            flush: Arc::clone(&self.flush),
        }
    }

    /// Asks the preparation worker for an out-of-band flush.
    pub fn request_flush(&self) {
        self.flush_handle().request_flush();
    }

    /// Current state of the preparation worker.
    pub fn preparation_state(&self) -> PreparationState {
        self.preparation_state.get()
    }

    /// Current state of the sending worker.
    pub fn sending_state(&self) -> SendingState {
        self.sending_state.get()
    }

    /// Returns `true` between a successful [`start`](Self::start) and
    /// [`shutdown`](Self::shutdown).
    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst) && !self.shut_down.load(Ordering::SeqCst)
    }

    /// Spawns the workers and starts the send triggers.
    ///
    /// If a worker thread cannot be spawned, the workers already running are
    /// interrupted and joined, the dispatcher reports itself as not running,
    /// and it cannot be started again. [`shutdown`](Self::shutdown) still
    /// drains whatever the store holds.
    pub fn start(&self) -> Result<(), DispatchError> {
        self.start_with(&|config: &DispatcherConfig, name, body| {
            WorkerHandle::spawn(config, name, body)
        })
    }

    fn start_with(&self, spawn: SpawnFn<'_>) -> Result<(), DispatchError> {
        if self.shut_down.load(Ordering::SeqCst)
            || self.stop.load(Ordering::SeqCst)
            || self.started.swap(true, Ordering::SeqCst)
        {
            return Err(DispatchError::AlreadyStarted);
        }

        if let Err(err) = self.spawn_workers(spawn) {
            log::error!("Dispatcher failed to start: {err}");
            self.interrupt_workers();
            let mut workers = self.workers.lock();
            workers.refresher = None;
            let timeout = self.config.shutdown_join_timeout();
            for worker in [workers.preparation.take(), workers.sending.take()]
                .into_iter()
                .flatten()
            {
                worker.join_timeout(timeout);
            }
            self.started.store(false, Ordering::SeqCst);
            return Err(err);
        }

        let handle: Arc<dyn FlushRequest> = Arc::new(self.flush_handle());
        for trigger in self.triggers.lock().iter_mut() {
            log::info!("Starting send trigger '{}'.", trigger.name());
            trigger.start(Arc::clone(&handle));
        }

        log::info!("Dispatcher started.");
        Ok(())
    }

    fn spawn_workers(&self, spawn: SpawnFn<'_>) -> Result<(), DispatchError> {
        let mut workers = self.workers.lock();

        let preparation = PreparationWorker {
            store: Arc::clone(&self.store),
            buffer: Arc::clone(&self.buffer),
            flush: Arc::clone(&self.flush),
            data_ready: Arc::clone(&self.data_ready),
            state: Arc::clone(&self.preparation_state),
        };
        workers.preparation = Some(spawn(
            &self.config,
            "preparing",
            Box::new(move || preparation.run()),
        )?);

        let sending = SendingWorker {
            buffer: Arc::clone(&self.buffer),
            transport: Arc::clone(&self.transport),
            data_ready: Arc::clone(&self.data_ready),
            stop: Arc::clone(&self.stop),
            state: Arc::clone(&self.sending_state),
        };
        workers.sending = Some(spawn(
            &self.config,
            "sending",
            Box::new(move || sending.run()),
        )?);

        if let Some(refresher) = self.refresher.lock().take() {
            let stop = Arc::clone(&self.refresher_stop);
            let period = self.config.sensor_refresh_interval();
            workers.refresher = Some(spawn(
                &self.config,
                "sensor-refresher",
                Box::new(move || refresher.run(stop, period)),
            )?);
        }
        Ok(())
    }

    fn interrupt_workers(&self) {
        self.refresher_stop.close();
        self.stop.store(true, Ordering::SeqCst);
        self.flush.close();
        self.data_ready.close();
        self.transport.connectivity().wake_all();
    }

    /// Stops everything and sends what is left.
    ///
    /// Only the first call does any work. The sequence is: stop the send
    /// triggers, interrupt the workers, wait for the preparation and sending
    /// workers (each bounded by the configured join timeout), run one last
    /// prepare and send cycle, and retire the agent. A worker that misses its
    /// deadline is left detached and reported through
    /// [`DrainOutcome::CompletedAfterTimeout`]; the final drain and the
    /// retirement run regardless. The final send is not bounded in time, and
    /// its failures are logged, never returned.
    pub fn shutdown(&self) -> DrainOutcome {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return DrainOutcome::AlreadyShutDown;
        }
        log::info!("Shutdown initiated, sending remaining data.");

        for trigger in self.triggers.lock().iter_mut() {
            log::debug!("Stopping send trigger '{}'.", trigger.name());
            trigger.stop();
        }

        self.interrupt_workers();

        let mut workers = self.workers.lock();
        // The refresher is interrupted but not awaited.
        workers.refresher = None;

        let timeout = self.config.shutdown_join_timeout();
        let mut laggard = None;
        for worker in [workers.preparation.take(), workers.sending.take()]
            .into_iter()
            .flatten()
        {
            let name = worker.name();
            if !worker.join_timeout(timeout) {
                log::error!("Worker '{name}' is still running, draining without it.");
                laggard.get_or_insert(name);
            }
        }
        drop(workers);

        let forwarded = prepare_batch(&self.store, self.buffer.as_ref());
        let end = Transmitter::default().transmit_ready(self.buffer.as_ref(), self.transport.as_ref());
        log::info!("Final drain prepared {forwarded} records, send cycle ended {end:?}.");

        if let Some(registration) = &self.registration {
            log::info!("Retiring agent registration.");
            registration.retire();
        }
        match laggard {
            Some(name) => DrainOutcome::CompletedAfterTimeout(name),
            None => DrainOutcome::Completed,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("preparation", &self.preparation_state())
            .field("sending", &self.sending_state())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if self.started.load(Ordering::SeqCst) {
            self.shutdown();
        }
    }
}
