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

//! Dispatcher configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use vigil_core::ConfigError;

/// Tuning knobs of the dispatch engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Period of the sensor refresher, in milliseconds.
    pub sensor_refresh_interval_ms: u64,
    /// Number of refresher ticks in one reset/gather/snapshot cycle.
    pub sensor_collect_iterations: u32,
    /// Bound on each worker join during the shutdown drain, in milliseconds.
    pub shutdown_join_timeout_ms: u64,
    /// Prefix of the worker thread names.
    pub thread_name_prefix: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            sensor_refresh_interval_ms: 1000,
            sensor_collect_iterations: 5,
            shutdown_join_timeout_ms: 10_000,
            thread_name_prefix: "vigil".to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Rejects values the workers cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensor_refresh_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "sensor_refresh_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.sensor_collect_iterations == 0 {
            return Err(ConfigError::Invalid(
                "sensor_collect_iterations must be greater than zero".to_string(),
            ));
        }
        if self.shutdown_join_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "shutdown_join_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Sensor refresher period.
    pub fn sensor_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.sensor_refresh_interval_ms)
    }

    /// Per-worker join bound used by the shutdown drain.
    pub fn shutdown_join_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_join_timeout_ms)
    }

    pub(crate) fn thread_name(&self, worker: &str) -> String {
        format!("{}-{}", self.thread_name_prefix, worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_agent_conventions() {
        let config = DispatcherConfig::default();
        assert_eq!(config.sensor_refresh_interval(), Duration::from_secs(1));
        assert_eq!(config.sensor_collect_iterations, 5);
        assert_eq!(config.shutdown_join_timeout(), Duration::from_secs(10));
        assert_eq!(config.thread_name("sending"), "vigil-sending");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = DispatcherConfig::from_json(r#"{ "sensor_refresh_interval_ms": 250 }"#).unwrap();
        assert_eq!(config.sensor_refresh_interval_ms, 250);
        assert_eq!(config.sensor_collect_iterations, 5);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = DispatcherConfig::from_json(r#"{ "sensor_refresh_interval_ms": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = DispatcherConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
