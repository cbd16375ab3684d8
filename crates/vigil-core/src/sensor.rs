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

//! Contracts for the periodic sensors driven by the sensor refresher.

use crate::error::SensorError;
use crate::key::RecordKey;
use crate::record::{EumEvent, ExceptionData, JmxSample, Record, SystemData};

/// The producer-facing side of the record store.
///
/// None of these operations fail or block: a producer thread always returns
/// immediately, whatever state the pipeline is in.
pub trait RecordSink: Send + Sync {
    /// Inserts a record, displacing any unflushed record under the same key.
    fn put(&self, key: RecordKey, record: Record);

    /// Adds method-level data under `(prefix.)method_id.sensor_type_id`.
    fn add_method_record(
        &self,
        sensor_type_id: u64,
        method_id: u64,
        prefix: Option<&str>,
        record: Record,
    ) {
        self.put(RecordKey::method(sensor_type_id, method_id, prefix), record);
    }

    /// Adds an exception chain. Only creation events are stored, and only the
    /// first one per exception identity within a flush interval.
    fn add_exception_record(&self, data: ExceptionData);

    /// Adds a JMX sample under its timestamp-qualified key.
    fn add_jmx_sample(&self, sample: JmxSample) {
        let key = RecordKey::Jmx {
            sensor_type_id: sample.sensor_type_id,
            object_name: sample.object_name.clone(),
            attribute_name: sample.attribute_name.clone(),
            timestamp_ms: sample.timestamp_ms,
        };
        self.put(key, Record::Jmx(sample));
    }

    /// Adds a platform snapshot under its sensor type id.
    fn add_platform_record(&self, data: SystemData) {
        let key = RecordKey::Platform {
            sensor_type_id: data.sensor_type_id,
        };
        self.put(key, Record::System(data));
    }

    /// Adds an end-user-monitoring event under a fresh unique key.
    fn add_eum_event(&self, event: EumEvent);
}

/// A counted platform sensor.
///
/// The refresher drives every counted sensor through a fixed cycle: the
/// accumulator is reset on the first tick, [`PlatformSensor::gather`] runs on
/// every tick, and [`PlatformSensor::snapshot`] is taken on the last one.
pub trait PlatformSensor: Send {
    /// Returns a human-readable name used in logs.
    fn name(&self) -> &str;

    /// Sensor type id the snapshots are keyed by.
    fn sensor_type_id(&self) -> u64;

    /// Clears the accumulated state.
    fn reset(&mut self);

    /// Takes one sample and folds it into the accumulator.
    ///
    /// An error disables the sensor for the rest of the process.
    fn gather(&mut self) -> Result<(), SensorError>;

    /// Produces the snapshot of the current cycle.
    fn snapshot(&mut self) -> Option<SystemData>;
}

/// An event-driven sensor that pushes its own data on every refresher tick.
pub trait EventSensor: Send {
    /// Returns a human-readable name used in logs.
    fn name(&self) -> &str;

    /// Pushes whatever is new into the sink.
    fn push(&mut self, sink: &dyn RecordSink);
}
