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

//! The background workers of the dispatch engine and their thread handles.

pub(crate) mod preparation;
pub mod refresher;
pub(crate) mod sending;
pub mod state;

use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A running worker thread that can be joined with a deadline.
///
/// The thread holds the sending half of a rendezvous channel for its whole
/// life; the channel disconnects when the thread exits, normally or by
/// unwinding, which lets [`WorkerHandle::join_timeout`] bound the wait.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    name: &'static str,
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

impl WorkerHandle {
    pub(crate) fn spawn(
        config: &DispatcherConfig,
        name: &'static str,
        body: impl FnOnce() + Send + 'static,
    ) -> Result<Self, DispatchError> {
        let (done_tx, done) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name(config.thread_name(name))
            .spawn(move || {
                let _done = done_tx;
                body();
            })
            .map_err(|source| DispatchError::Spawn {
                worker: name,
                source,
            })?;
        Ok(Self { name, handle, done })
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Waits up to `timeout` for the thread to exit.
    ///
    /// Returns `false` if the deadline passed; the thread is then left
    /// detached.
    pub(crate) fn join_timeout(self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Worker '{}' did not stop within {:?}.",
                    self.name,
                    timeout
                );
                false
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.handle.join().is_err() {
                    log::error!("Worker '{}' terminated by a panic.", self.name);
                }
                true
            }
        }
    }
}
