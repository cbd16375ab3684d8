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

//! Logical keys addressing unflushed records.

use std::fmt::{self, Display};

/// The composite key a record is stored under until the next flush.
///
/// Each record kind has exactly one key shape. Two records share a key only if
/// they describe the same logical entity within one flush interval, which is
/// what drives merging, displacement and first-write-wins in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// Method-level data: `(prefix.)method_id.sensor_type_id`.
    Method {
        /// Optional producer-chosen discriminator (e.g. a timer start value).
        prefix: Option<String>,
        /// Instrumented method.
        method_id: u64,
        /// Sensor type that produced the data.
        sensor_type_id: u64,
    },
    /// Exception chains: `sensor_type_id::identity_hash`.
    Exception {
        /// Sensor type that observed the exception.
        sensor_type_id: u64,
        /// Identity of the exception object.
        identity_hash: u64,
    },
    /// JMX samples, unique per sample through the timestamp.
    Jmx {
        /// Sensor type that took the sample.
        sensor_type_id: u64,
        /// Object name of the managed bean.
        object_name: String,
        /// Sampled attribute.
        attribute_name: String,
        /// Time of the sample, in epoch milliseconds.
        timestamp_ms: u64,
    },
    /// Platform sensor snapshots, one per sensor type.
    Platform {
        /// Sensor type that produced the snapshot.
        sensor_type_id: u64,
    },
    /// A store-assigned unique sequence number, for records without a stable
    /// key and for records displaced by a collision.
    Sequence(u64),
}

impl RecordKey {
    /// Builds a method key.
    pub fn method(sensor_type_id: u64, method_id: u64, prefix: Option<&str>) -> Self {
        RecordKey::Method {
            prefix: prefix.map(str::to_owned),
            method_id,
            sensor_type_id,
        }
    }

    /// Builds an exception-chain key.
    pub fn exception(sensor_type_id: u64, identity_hash: u64) -> Self {
        RecordKey::Exception {
            sensor_type_id,
            identity_hash,
        }
    }

    /// Returns `true` for store-assigned sequence keys.
    pub fn is_sequence(&self) -> bool {
        matches!(self, RecordKey::Sequence(_))
    }
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Method {
                prefix,
                method_id,
                sensor_type_id,
            } => {
                if let Some(prefix) = prefix {
                    write!(f, "{prefix}.")?;
                }
                write!(f, "{method_id}.{sensor_type_id}")
            }
            RecordKey::Exception {
                sensor_type_id,
                identity_hash,
            } => write!(f, "{sensor_type_id}::{identity_hash}"),
            RecordKey::Jmx {
                sensor_type_id,
                object_name,
                attribute_name,
                timestamp_ms,
            } => write!(
                f,
                "{sensor_type_id}.{object_name}.{attribute_name}.{timestamp_ms}"
            ),
            RecordKey::Platform { sensor_type_id } => write!(f, "{sensor_type_id}"),
            RecordKey::Sequence(n) => write!(f, "#{n}"),
        }
    }
}
