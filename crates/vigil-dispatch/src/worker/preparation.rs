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

//! Preparation worker: turns flush requests into batches.

use super::state::{PreparationState, StateCell};
use crate::signal::{Signal, Wake};
use crate::store::RecordStore;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use vigil_core::BatchBuffer;

/// Runs one swap of the store and forwards a non-empty batch to the buffer.
///
/// Returns the number of records forwarded. The buffer is not touched when
/// nothing was pending.
pub(crate) fn prepare_batch(store: &RecordStore, buffer: &dyn BatchBuffer) -> usize {
    let Some(batch) = store.swap_and_drain() else {
        log::trace!("Flush requested on an empty store.");
        return 0;
    };
    if batch.is_empty() {
        return 0;
    }

    let len = batch.len();
    if catch_unwind(AssertUnwindSafe(|| buffer.accept(batch))).is_err() {
        log::error!("Batch buffer panicked while accepting {len} records.");
        return 0;
    }
    log::debug!("Prepared a batch of {len} records.");
    len
}

pub(crate) struct PreparationWorker {
    pub(crate) store: Arc<RecordStore>,
    pub(crate) buffer: Arc<dyn BatchBuffer>,
    pub(crate) flush: Arc<Signal>,
    pub(crate) data_ready: Arc<Signal>,
    pub(crate) state: Arc<StateCell<PreparationState>>,
}

impl PreparationWorker {
    pub(crate) fn run(self) {
        log::info!("Preparation worker started.");

        loop {
            self.state.set(PreparationState::Waiting);
            match self.flush.wait() {
                Wake::Raised => {
                    self.state.set(PreparationState::Preparing);
                    if prepare_batch(&self.store, self.buffer.as_ref()) > 0 {
                        self.data_ready.raise();
                    }
                }
                Wake::Closed | Wake::TimedOut => break,
            }
        }

        self.state.set(PreparationState::Stopping);
        log::info!("Preparation worker stopped.");
    }
}
