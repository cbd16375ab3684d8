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

//! Registration that only records the agent's retirement in the log.

use std::sync::atomic::{AtomicBool, Ordering};
use vigil_core::Registration;

/// Logs the retirement of an agent instance, once.
#[derive(Debug)]
pub struct LogRegistration {
    agent_name: String,
    retired: AtomicBool,
}

impl LogRegistration {
    /// Creates a registration for the named agent.
    pub fn new(agent_name: impl Into<String>) -> Self {
        let agent_name = agent_name.into();
        log::info!("Agent '{agent_name}' registered.");
        Self {
            agent_name,
            retired: AtomicBool::new(false),
        }
    }

    /// Returns `true` once [`Registration::retire`] has been called.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }
}

impl Registration for LogRegistration {
    fn retire(&self) {
        if !self.retired.swap(true, Ordering::SeqCst) {
            log::info!("Agent '{}' retired.", self.agent_name);
        }
    }
}
