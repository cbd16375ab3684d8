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

//! # Vigil Dispatch
//!
//! The in-process buffering and dispatch engine of the agent.
//!
//! Application threads record data into a [`RecordStore`] without ever
//! blocking. A small, fixed set of background workers moves that data out:
//!
//! - the **preparation worker** swaps the store's buffers on request and hands
//!   the flattened batch to the batching collaborator,
//! - the **sending worker** drains the batching collaborator into the
//!   transport whenever the transport is connected,
//! - the **sensor refresher** samples platform and event-driven sensors on a
//!   fixed period and feeds the results back into the store.
//!
//! The [`Dispatcher`] owns the workers and runs the shutdown drain that
//! forces one last prepare and send cycle before the host process exits.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod signal;
pub mod store;
pub mod worker;

pub use config::DispatcherConfig;
pub use dispatcher::{Dispatcher, DispatcherBuilder, DrainOutcome, FlushHandle};
pub use error::DispatchError;
pub use store::RecordStore;
pub use worker::refresher::SensorRefresher;
pub use worker::state::{PreparationState, SendingState};
