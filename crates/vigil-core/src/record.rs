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

//! The telemetry records producers hand to the agent.
//!
//! A [`Record`] is the unit that travels from an instrumented thread, through the
//! record store and the batching collaborator, to the transport. Every variant
//! is serializable so transports can put batches on the wire directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A single unit of telemetry data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// Aggregated timing of a method.
    Timer(TimerData),
    /// An exception chain, captured at creation time.
    Exception(ExceptionData),
    /// A platform sensor snapshot (CPU, memory, ...).
    System(SystemData),
    /// A single JMX attribute sample.
    Jmx(JmxSample),
    /// An end-user-monitoring event.
    Eum(EumEvent),
}

impl Record {
    /// Returns the sensor type that produced this record, if it has one.
    pub fn sensor_type_id(&self) -> Option<u64> {
        match self {
            Record::Timer(d) => Some(d.sensor_type_id),
            Record::Exception(d) => Some(d.sensor_type_id),
            Record::System(d) => Some(d.sensor_type_id),
            Record::Jmx(d) => Some(d.sensor_type_id),
            Record::Eum(_) => None,
        }
    }

    /// Returns the time the record was created, in epoch milliseconds.
    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Record::Timer(d) => d.timestamp_ms,
            Record::Exception(d) => d.timestamp_ms,
            Record::System(d) => d.timestamp_ms,
            Record::Jmx(d) => d.timestamp_ms,
            Record::Eum(d) => d.timestamp_ms,
        }
    }

    /// Returns the inner timer data if this is a [`Record::Timer`].
    pub fn as_timer(&self) -> Option<&TimerData> {
        match self {
            Record::Timer(d) => Some(d),
            _ => None,
        }
    }

    /// Mutable variant of [`Record::as_timer`].
    pub fn as_timer_mut(&mut self) -> Option<&mut TimerData> {
        match self {
            Record::Timer(d) => Some(d),
            _ => None,
        }
    }
}

/// Timing statistics of one method, aggregated between two flushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerData {
    /// Sensor type that measured the method.
    pub sensor_type_id: u64,
    /// Identifier of the instrumented method.
    pub method_id: u64,
    /// Time of the first measurement, in epoch milliseconds.
    pub timestamp_ms: u64,
    /// Number of invocations folded into this record.
    pub count: u64,
    /// Shortest invocation in milliseconds.
    pub min_ms: f64,
    /// Longest invocation in milliseconds.
    pub max_ms: f64,
    /// Sum of all invocation durations in milliseconds.
    pub sum_ms: f64,
}

impl TimerData {
    /// Creates an empty timer for the given method.
    pub fn new(sensor_type_id: u64, method_id: u64) -> Self {
        Self {
            sensor_type_id,
            method_id,
            timestamp_ms: now_millis(),
            count: 0,
            min_ms: f64::MAX,
            max_ms: 0.0,
            sum_ms: 0.0,
        }
    }

    /// Folds one invocation duration into the statistics.
    pub fn add_duration(&mut self, duration_ms: f64) {
        self.count += 1;
        self.sum_ms += duration_ms;
        self.min_ms = self.min_ms.min(duration_ms);
        self.max_ms = self.max_ms.max(duration_ms);
    }

    /// Average invocation duration, or `None` when nothing was measured.
    pub fn average_ms(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum_ms / self.count as f64)
    }
}

/// Lifecycle stage of an exception as observed by the instrumentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionEvent {
    /// The exception object was constructed.
    Created,
    /// The exception left a method without being handled there.
    Passed,
    /// The exception was caught and handled.
    Handled,
    /// The exception was caught and a different one thrown.
    Rethrown,
}

/// One exception, optionally linked to the next stage of its chain.
///
/// Producers build the chain themselves; the record store only ever keeps the
/// creation record, which carries the nested stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionData {
    /// Sensor type that observed the exception.
    pub sensor_type_id: u64,
    /// Method in which this stage was observed.
    pub method_id: u64,
    /// Identity of the exception object, stable across its lifecycle.
    pub identity_hash: u64,
    /// Time of observation, in epoch milliseconds.
    pub timestamp_ms: u64,
    /// Lifecycle stage.
    pub event: ExceptionEvent,
    /// Fully qualified type of the exception.
    pub error_type: String,
    /// Message carried by the exception, if any.
    pub message: Option<String>,
    /// Rendered stack trace, if captured.
    pub stack_trace: Option<String>,
    /// The next observed stage of the same exception.
    pub child: Option<Box<ExceptionData>>,
}

impl ExceptionData {
    /// Returns `true` if this record describes the creation of the exception.
    pub fn is_creation(&self) -> bool {
        self.event == ExceptionEvent::Created
    }

    /// Appends a later stage to the end of the chain.
    pub fn append_stage(&mut self, stage: ExceptionData) {
        match self.child {
            Some(ref mut child) => child.append_stage(stage),
            None => self.child = Some(Box::new(stage)),
        }
    }

    /// Number of stages in the chain, including this one.
    pub fn chain_len(&self) -> usize {
        1 + self.child.as_ref().map_or(0, |c| c.chain_len())
    }
}

/// A snapshot produced by a platform sensor at the end of its gather cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemData {
    /// Sensor type that produced the snapshot.
    pub sensor_type_id: u64,
    /// Time of the snapshot, in epoch milliseconds.
    pub timestamp_ms: u64,
    /// Named values (e.g. `"cpu.usage.avg"`).
    pub values: BTreeMap<String, f64>,
}

impl SystemData {
    /// Creates an empty snapshot stamped with the current time.
    pub fn new(sensor_type_id: u64) -> Self {
        Self {
            sensor_type_id,
            timestamp_ms: now_millis(),
            values: BTreeMap::new(),
        }
    }

    /// Adds a named value, returning the snapshot for chaining.
    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }
}

/// One sampled JMX attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JmxSample {
    /// Sensor type that took the sample.
    pub sensor_type_id: u64,
    /// Object name of the managed bean.
    pub object_name: String,
    /// Sampled attribute.
    pub attribute_name: String,
    /// Rendered attribute value.
    pub value: String,
    /// Time of the sample, in epoch milliseconds.
    pub timestamp_ms: u64,
}

/// An end-user-monitoring event reported by a browser or client agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EumEvent {
    /// Session the event belongs to.
    pub session_id: u64,
    /// Event type (e.g. `"page_load"`, `"ajax"`).
    pub event_type: String,
    /// Time of the event, in epoch milliseconds.
    pub timestamp_ms: u64,
    /// Free-form event payload.
    pub payload: serde_json::Value,
}
