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

//! Registry of pending-count listeners.

use parking_lot::RwLock;
use std::sync::Arc;
use vigil_core::CountListener;

/// Listeners notified after every insertion into the record store.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn CountListener>>>,
}

impl ListenerRegistry {
    /// Adds a listener. Registering the same listener twice has no effect.
    pub(crate) fn register(&self, listener: Arc<dyn CountListener>) -> bool {
        let mut listeners = self.listeners.write();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Removes a listener. Returns `false` if it was not registered.
    pub(crate) fn unregister(&self, listener: &Arc<dyn CountListener>) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
        listeners.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Calls every listener without holding the registry lock, so a
    /// listener may register or unregister listeners from its callback.
    pub(crate) fn notify(&self, pending: usize) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.content_changed(pending);
        }
    }
}
