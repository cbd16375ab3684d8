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

//! Periodic driver of the platform and event-driven sensors.

use crate::signal::{Signal, Wake};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use vigil_core::{EventSensor, PlatformSensor, RecordSink};

/// Drives sensors on a fixed period and files their output into a sink.
///
/// Counted sensors run a cycle of `collect_iterations` ticks: the first tick
/// resets their accumulators, every tick gathers, and the last tick takes a
/// snapshot that is stored under the sensor's type id. A sensor whose gather
/// step fails or panics is dropped for good; the others carry on.
///
/// Event-driven sensors are asked to push their data on every tick,
/// independently of the cycle.
///
/// The refresher is a plain state machine: [`SensorRefresher::tick`] runs one
/// step synchronously, and the dispatcher calls it from its own thread.
pub struct SensorRefresher {
    sink: Arc<dyn RecordSink>,
    counted: Vec<Box<dyn PlatformSensor>>,
    event_driven: Vec<Box<dyn EventSensor>>,
    collect_iterations: u32,
    count: u32,
}

impl SensorRefresher {
    /// Creates a refresher with no sensors.
    ///
    /// A `collect_iterations` of zero is treated as one.
    pub fn new(sink: Arc<dyn RecordSink>, collect_iterations: u32) -> Self {
        Self {
            sink,
            counted: Vec::new(),
            event_driven: Vec::new(),
            collect_iterations: collect_iterations.max(1),
            count: 0,
        }
    }

    /// Adds a counted platform sensor.
    pub fn add_platform_sensor(&mut self, sensor: Box<dyn PlatformSensor>) {
        log::debug!("Registered platform sensor '{}'.", sensor.name());
        self.counted.push(sensor);
    }

    /// Adds an event-driven sensor.
    pub fn add_event_sensor(&mut self, sensor: Box<dyn EventSensor>) {
        log::debug!("Registered event sensor '{}'.", sensor.name());
        self.event_driven.push(sensor);
    }

    /// Number of counted sensors still active.
    pub fn active_platform_sensors(&self) -> usize {
        self.counted.len()
    }

    /// Position in the current counted cycle; `0` right after a snapshot.
    pub fn cycle_position(&self) -> u32 {
        self.count
    }

    /// Runs one refresher step.
    pub fn tick(&mut self) {
        if !self.counted.is_empty() {
            self.tick_counted();
        }

        let sink = self.sink.as_ref();
        for sensor in &mut self.event_driven {
            if catch_unwind(AssertUnwindSafe(|| sensor.push(sink))).is_err() {
                log::error!("Event sensor '{}' panicked while pushing data.", sensor.name());
            }
        }
    }

    fn tick_counted(&mut self) {
        self.count += 1;

        if self.count == 1 {
            for sensor in &mut self.counted {
                sensor.reset();
            }
        }

        self.counted.retain_mut(|sensor| {
            match catch_unwind(AssertUnwindSafe(|| sensor.gather())) {
                Ok(Ok(())) => true,
                Ok(Err(err)) => {
                    log::error!("Disabling platform sensor '{}': {err}.", sensor.name());
                    false
                }
                Err(_) => {
                    log::error!(
                        "Disabling platform sensor '{}': panicked while gathering.",
                        sensor.name()
                    );
                    false
                }
            }
        });

        if self.count >= self.collect_iterations {
            for sensor in &mut self.counted {
                if let Some(mut data) = sensor.snapshot() {
                    data.sensor_type_id = sensor.sensor_type_id();
                    self.sink.add_platform_record(data);
                }
            }
            self.count = 0;
        }
    }

    /// Ticks every `period` until `stop` is closed.
    pub(crate) fn run(mut self, stop: Arc<Signal>, period: Duration) {
        log::info!(
            "Sensor refresher started with {} platform and {} event sensors.",
            self.counted.len(),
            self.event_driven.len()
        );

        loop {
            match stop.wait_timeout(period) {
                Wake::Closed => break,
                Wake::TimedOut | Wake::Raised => self.tick(),
            }
        }

        log::info!("Sensor refresher stopped.");
    }
}

impl std::fmt::Debug for SensorRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorRefresher")
            .field("platform_sensors", &self.counted.len())
            .field("event_sensors", &self.event_driven.len())
            .field("collect_iterations", &self.collect_iterations)
            .field("count", &self.count)
            .finish()
    }
}
