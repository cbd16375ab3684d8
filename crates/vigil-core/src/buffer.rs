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

//! Contract of the batching collaborator sitting between the preparation and
//! sending workers.

use crate::record::Record;

/// Queues prepared batches until the sending worker transmits them.
///
/// The implementation owns the memory policy: it may bound, drop or coalesce
/// batches under sustained backpressure. The dispatch engine only ever offers
/// batches and pulls them back out.
pub trait BatchBuffer: Send + Sync {
    /// Accepts a freshly prepared batch.
    fn accept(&self, batch: Vec<Record>);

    /// Returns `true` if at least one batch is ready for transmission.
    fn has_ready(&self) -> bool;

    /// Removes and returns the next batch to transmit.
    fn take_next(&self) -> Option<Vec<Record>>;

    /// Hands back a batch whose transmission failed.
    ///
    /// The default re-offers it like a new batch; implementations that care
    /// about ordering should put it back at the front.
    fn requeue(&self, batch: Vec<Record>) {
        self.accept(batch);
    }
}
