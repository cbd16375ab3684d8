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

//! # Vigil Core
//!
//! Foundational crate containing the record model and the interface contracts
//! that the dispatch engine and its collaborators agree on.
//!
//! This crate defines the abstract "what" of the agent: the records producers
//! hand over, the keys they are addressed by, and the traits implemented by the
//! transport, the batching policy, the send triggers and the sensors.
//! `vigil-dispatch` provides the buffering and worker machinery, and
//! `vigil-infra` provides concrete collaborator implementations.

#![warn(missing_docs)]

pub mod buffer;
pub mod error;
pub mod key;
pub mod pending;
pub mod record;
pub mod sensor;
pub mod transport;
pub mod trigger;

pub use buffer::BatchBuffer;
pub use error::{ConfigError, SensorError, TransportError};
pub use key::RecordKey;
pub use pending::{CountListener, PendingValue};
pub use record::{
    now_millis, EumEvent, ExceptionData, ExceptionEvent, JmxSample, Record, SystemData, TimerData,
};
pub use sensor::{EventSensor, PlatformSensor, RecordSink};
pub use transport::{ConnectivityMonitor, Registration, Transport};
pub use trigger::{FlushRequest, SendTrigger};
