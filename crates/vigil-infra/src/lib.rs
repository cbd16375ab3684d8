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

//! # Vigil Infra
//!
//! Concrete implementations of the collaborator contracts defined in
//! `vigil-core`: a bounded batch queue, send triggers, `sysinfo`-backed
//! platform sensors, a JSON-lines transport and a logging registration.

#![warn(missing_docs)]

pub mod queue;
pub mod registration;
pub mod sensors;
pub mod transport;
pub mod trigger;

pub use queue::{BoundedBatchQueue, QueueConfig};
pub use registration::LogRegistration;
pub use sensors::{CpuSensor, MemorySensor};
pub use transport::JsonLinesTransport;
pub use trigger::{IntervalTrigger, IntervalTriggerConfig, PendingCountTrigger};
