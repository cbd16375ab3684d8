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

//! Bounded FIFO batch buffer.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use vigil_core::{BatchBuffer, Record};

/// Configuration of a [`BoundedBatchQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of batches held at once.
    pub max_batches: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_batches: 64 }
    }
}

/// A FIFO of batches that drops the oldest batch when full.
///
/// A batch handed back after a failed send goes to the front, since it is
/// older than anything queued behind it.
#[derive(Debug)]
pub struct BoundedBatchQueue {
    capacity: usize,
    batches: Mutex<VecDeque<Vec<Record>>>,
    dropped: AtomicU64,
}

impl BoundedBatchQueue {
    /// Creates an empty queue. A capacity of zero is treated as one.
    pub fn new(config: &QueueConfig) -> Self {
        let capacity = config.max_batches.max(1);
        Self {
            capacity,
            batches: Mutex::new(VecDeque::with_capacity(capacity)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Number of batches currently queued.
    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    /// Returns `true` if no batch is queued.
    pub fn is_empty(&self) -> bool {
        self.batches.lock().is_empty()
    }

    /// Number of batches dropped on overflow since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, batch: &[Record]) {
        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        log::warn!(
            "Batch queue full, dropped the oldest batch of {} records ({total} dropped so far).",
            batch.len()
        );
    }
}

impl Default for BoundedBatchQueue {
    fn default() -> Self {
        Self::new(&QueueConfig::default())
    }
}

impl BatchBuffer for BoundedBatchQueue {
    fn accept(&self, batch: Vec<Record>) {
        let mut batches = self.batches.lock();
        if batches.len() >= self.capacity {
            if let Some(oldest) = batches.pop_front() {
                self.record_drop(&oldest);
            }
        }
        batches.push_back(batch);
    }

    fn has_ready(&self) -> bool {
        !self.batches.lock().is_empty()
    }

    fn take_next(&self) -> Option<Vec<Record>> {
        self.batches.lock().pop_front()
    }

    fn requeue(&self, batch: Vec<Record>) {
        let mut batches = self.batches.lock();
        if batches.len() >= self.capacity {
            // The returned batch is the oldest one.
            self.record_drop(&batch);
            return;
        }
        batches.push_front(batch);
    }
}
