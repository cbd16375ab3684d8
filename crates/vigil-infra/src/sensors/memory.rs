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

use super::Aggregate;
use sysinfo::System;
use vigil_core::{PlatformSensor, SensorError, SystemData};

/// Used and free system memory, in bytes, aggregated over the gather cycle.
pub struct MemorySensor {
    sensor_type_id: u64,
    system: System,
    used: Aggregate,
    free: Aggregate,
}

impl MemorySensor {
    /// Creates a memory sensor reporting under `sensor_type_id`.
    pub fn new(sensor_type_id: u64) -> Self {
        Self {
            sensor_type_id,
            system: System::new(),
            used: Aggregate::default(),
            free: Aggregate::default(),
        }
    }
}

impl PlatformSensor for MemorySensor {
    fn name(&self) -> &str {
        "memory"
    }

    fn sensor_type_id(&self) -> u64 {
        self.sensor_type_id
    }

    fn reset(&mut self) {
        self.used = Aggregate::default();
        self.free = Aggregate::default();
    }

    fn gather(&mut self) -> Result<(), SensorError> {
        self.system.refresh_memory();
        if self.system.total_memory() == 0 {
            return Err(SensorError::Unavailable(
                "total memory reported as zero".to_string(),
            ));
        }
        self.used.push(self.system.used_memory() as f64);
        self.free.push(self.system.available_memory() as f64);
        Ok(())
    }

    fn snapshot(&mut self) -> Option<SystemData> {
        if self.used.is_empty() {
            return None;
        }
        let data = SystemData::new(self.sensor_type_id)
            .with_value("memory.total", self.system.total_memory() as f64);
        let data = self.used.write_to(data, "memory.used");
        Some(self.free.write_to(data, "memory.free"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_the_cycle() {
        let mut sensor = MemorySensor::new(22);
        if sensor.gather().is_err() {
            return;
        }
        assert!(sensor.snapshot().is_some());

        sensor.reset();
        assert!(sensor.snapshot().is_none());
    }

    #[test]
    fn used_memory_fits_in_total() {
        let mut sensor = MemorySensor::new(22);
        for _ in 0..3 {
            if sensor.gather().is_err() {
                return;
            }
        }

        let data = sensor.snapshot().unwrap();
        assert!(data.values["memory.used.max"] <= data.values["memory.total"]);
        assert!(data.values["memory.used.min"] <= data.values["memory.used.avg"]);
    }
}
