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

//! Platform sensors backed by `sysinfo`.

mod cpu;
mod memory;

pub use cpu::CpuSensor;
pub use memory::MemorySensor;

use vigil_core::SystemData;

/// Running min/max/average of one gauge over a gather cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Aggregate {
    count: u64,
    min: f64,
    max: f64,
    sum: f64,
}

impl Aggregate {
    pub(crate) fn push(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.count += 1;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Writes `{name}.min`, `{name}.max` and `{name}.avg` into `data`.
    pub(crate) fn write_to(&self, data: SystemData, name: &str) -> SystemData {
        if self.is_empty() {
            return data;
        }
        data.with_value(format!("{name}.min"), self.min)
            .with_value(format!("{name}.max"), self.max)
            .with_value(format!("{name}.avg"), self.sum / self.count as f64)
    }
}
