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

//! Errors surfaced by the dispatcher lifecycle.

use thiserror::Error;

/// An error raised while assembling or starting a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A required collaborator was not provided to the builder.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] vigil_core::ConfigError),
    /// `start` was called on a dispatcher that is already running or shut down.
    #[error("dispatcher already started")]
    AlreadyStarted,
    /// A worker thread could not be spawned.
    #[error("failed to spawn {worker} thread")]
    Spawn {
        /// Name of the worker.
        worker: &'static str,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}
