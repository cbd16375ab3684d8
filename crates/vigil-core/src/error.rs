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

//! Error types shared between the dispatch engine and its collaborators.

use thiserror::Error;

/// A failure reported by a [`Transport`](crate::Transport) while sending a batch.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote collector could not be reached.
    ///
    /// `timeout` distinguishes a collector that stopped answering in time from
    /// any other reachability problem, because the two are logged differently.
    #[error("collector unreachable{}", timeout_suffix(.timeout))]
    ServerUnreachable {
        /// Whether the failure was a timeout.
        timeout: bool,
    },
    /// The collector answered but refused the batch.
    #[error("collector rejected batch: {0}")]
    Rejected(String),
    /// Any other, unclassified failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn timeout_suffix(timeout: &bool) -> &'static str {
    if *timeout {
        " (timeout)"
    } else {
        ""
    }
}

impl TransportError {
    /// Returns `true` for a [`TransportError::ServerUnreachable`] caused by a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::ServerUnreachable { timeout: true })
    }
}

/// A failure raised by a periodic sensor during its gather step.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The resource the sensor samples is not available on this host.
    #[error("sensor resource unavailable: {0}")]
    Unavailable(String),
    /// Gathering failed for another reason.
    #[error("sensor gather failed")]
    Gather(#[source] anyhow::Error),
}

/// An error produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value was syntactically valid but not acceptable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
