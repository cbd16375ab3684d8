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

/// Global CPU usage, in percent, aggregated over the gather cycle.
pub struct CpuSensor {
    sensor_type_id: u64,
    system: System,
    usage: Aggregate,
}

impl CpuSensor {
    /// Creates a CPU sensor reporting under `sensor_type_id`.
    pub fn new(sensor_type_id: u64) -> Self {
        let mut system = System::new();
        // Usage is computed between two refreshes; prime the first one.
        system.refresh_cpu_usage();
        Self {
            sensor_type_id,
            system,
            usage: Aggregate::default(),
        }
    }
}

impl PlatformSensor for CpuSensor {
    fn name(&self) -> &str {
        "cpu"
    }

    fn sensor_type_id(&self) -> u64 {
        self.sensor_type_id
    }

    fn reset(&mut self) {
        self.usage = Aggregate::default();
    }

    fn gather(&mut self) -> Result<(), SensorError> {
        self.system.refresh_cpu_usage();
        if self.system.cpus().is_empty() {
            return Err(SensorError::Unavailable("no CPU reported".to_string()));
        }
        self.usage.push(f64::from(self.system.global_cpu_usage()));
        Ok(())
    }

    fn snapshot(&mut self) -> Option<SystemData> {
        if self.usage.is_empty() {
            return None;
        }
        let data = SystemData::new(self.sensor_type_id)
            .with_value("cpu.count", self.system.cpus().len() as f64);
        Some(self.usage.write_to(data, "cpu.usage"))
    }
}
