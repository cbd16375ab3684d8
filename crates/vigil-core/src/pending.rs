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

//! Deferred records and pending-count observers.

use crate::record::Record;

/// A record whose final representation is produced once, at flush time.
///
/// Producers register a holder under a composite key and keep feeding it
/// through their own handle (interior mutability is the implementor's
/// business). The preparation worker calls [`PendingValue::finalize`] exactly
/// once, when the holder's flush interval ends, and never again.
pub trait PendingValue: Send + Sync {
    /// Produces the final record.
    fn finalize(&self) -> Record;
}

impl<F> PendingValue for F
where
    F: Fn() -> Record + Send + Sync,
{
    fn finalize(&self) -> Record {
        self()
    }
}

/// Observer of the number of records waiting for the next flush.
///
/// Notifications are fire-and-forget and are delivered on the producer's
/// thread, so implementations must be cheap.
pub trait CountListener: Send + Sync {
    /// Called after every successful insertion with the current pending count.
    fn content_changed(&self, pending: usize);
}
