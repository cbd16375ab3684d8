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

//! Send-trigger strategies deciding when a flush cycle starts.

use std::sync::Arc;

/// Handle through which a trigger asks for a flush cycle.
///
/// Requests are levels, not events: any number of requests made while a cycle
/// is already running collapse into at most one more cycle.
pub trait FlushRequest: Send + Sync {
    /// Asks the preparation worker to run a cycle.
    fn request_flush(&self);
}

/// An independently lifecycled strategy that requests flushes.
pub trait SendTrigger: Send {
    /// Returns a human-readable name used in logs.
    fn name(&self) -> &str;

    /// Starts the trigger. It may call `flush` from any thread until stopped.
    fn start(&mut self, flush: Arc<dyn FlushRequest>);

    /// Stops the trigger. No flush requests are issued after this returns.
    fn stop(&mut self);
}
