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

//! Concurrent, double-buffered holding area for records awaiting a flush.

mod listeners;
mod roles;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vigil_core::{
    CountListener, EumEvent, ExceptionData, PendingValue, Record, RecordKey, RecordSink,
};

use self::listeners::ListenerRegistry;
use self::roles::RoleExchange;

/// Key-addressed store of unflushed records and pending-value holders.
///
/// Every record kind lives in a pair of maps: producers write to the *active*
/// one while the preparation worker owns the *processing* one. The roles of
/// both pairs are exchanged together by a single atomic flip in
/// [`RecordStore::swap_and_drain`], so a producer's write always lands
/// entirely in one flush interval.
///
/// Producer operations never block and never fail. A record inserted under a
/// key that still holds an unflushed record pushes the older one to a fresh
/// sequence key instead of overwriting it.
pub struct RecordStore {
    roles: RoleExchange,
    records: [DashMap<RecordKey, Record>; 2],
    pending: [DashMap<RecordKey, Arc<dyn PendingValue>>; 2],
    sequence: AtomicU64,
    listeners: ListenerRegistry,
    drain: Mutex<()>,
}

impl RecordStore {
    /// Creates an empty store with its own sequence counter.
    pub fn new() -> Self {
        Self {
            roles: RoleExchange::default(),
            records: [DashMap::new(), DashMap::new()],
            pending: [DashMap::new(), DashMap::new()],
            sequence: AtomicU64::new(0),
            listeners: ListenerRegistry::default(),
            drain: Mutex::new(()),
        }
    }

    fn next_sequence_key(&self) -> RecordKey {
        RecordKey::Sequence(self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Number of records and pending-value holders in the active role.
    pub fn pending_count(&self) -> usize {
        let slot = self.roles.active();
        self.records[slot].len() + self.pending[slot].len()
    }

    /// Returns `true` if nothing is waiting for the next flush.
    pub fn is_empty(&self) -> bool {
        let slot = self.roles.active();
        self.records[slot].is_empty() && self.pending[slot].is_empty()
    }

    fn notify_listeners(&self) {
        if !self.listeners.is_empty() {
            self.listeners.notify(self.pending_count());
        }
    }

    /// Installs `record` under `key` only if `is_creation` is set and the key
    /// is still free in the current flush interval.
    ///
    /// Returns `true` if the record was installed.
    pub fn put_if_first(&self, key: RecordKey, record: Record, is_creation: bool) -> bool {
        if !is_creation {
            return false;
        }
        let installed = {
            let guard = self.roles.enter();
            match self.records[guard.slot()].entry(key) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(record);
                    true
                }
            }
        };
        if installed {
            self.notify_listeners();
        }
        installed
    }

    /// Applies `update` to the unflushed record under `key`, in place.
    ///
    /// Returns `false` if no such record exists in the current interval.
    ///
    /// `update` runs while the map shard holding `key` is write-locked and
    /// while the caller counts as a writer of the active buffer. It must be
    /// short and must not call back into this store; doing so can deadlock,
    /// and a slow closure stalls both the swap and other producers on that
    /// shard.
    pub fn update_record(&self, key: &RecordKey, update: impl FnOnce(&mut Record)) -> bool {
        let guard = self.roles.enter();
        match self.records[guard.slot()].get_mut(key) {
            Some(mut record) => {
                update(record.value_mut());
                true
            }
            None => false,
        }
    }

    /// Folds new data into the method record under
    /// `(prefix.)method_id.sensor_type_id`, creating it with `init` if absent.
    ///
    /// `init` and `update` run under the same shard lock as in
    /// [`update_record`](Self::update_record), with the same restrictions.
    /// Concurrent folds into one key are serialized by that lock.
    pub fn update_method_record(
        &self,
        sensor_type_id: u64,
        method_id: u64,
        prefix: Option<&str>,
        init: impl FnOnce() -> Record,
        update: impl FnOnce(&mut Record),
    ) {
        let key = RecordKey::method(sensor_type_id, method_id, prefix);
        {
            let guard = self.roles.enter();
            let mut record = self.records[guard.slot()].entry(key).or_insert_with(init);
            update(record.value_mut());
        }
        self.notify_listeners();
    }

    /// Returns a copy of the unflushed record under `key`.
    pub fn get(&self, key: &RecordKey) -> Option<Record> {
        let guard = self.roles.enter();
        self.records[guard.slot()].get(key).map(|r| r.value().clone())
    }

    /// Returns a copy of the unflushed method record, if any.
    pub fn method_record(
        &self,
        sensor_type_id: u64,
        method_id: u64,
        prefix: Option<&str>,
    ) -> Option<Record> {
        self.get(&RecordKey::method(sensor_type_id, method_id, prefix))
    }

    /// Returns a copy of the stored creation record of an exception, if any.
    pub fn exception_record(&self, sensor_type_id: u64, identity_hash: u64) -> Option<ExceptionData> {
        match self.get(&RecordKey::exception(sensor_type_id, identity_hash)) {
            Some(Record::Exception(data)) => Some(data),
            _ => None,
        }
    }

    /// Registers a pending-value holder, finalized at the next flush.
    ///
    /// A holder already registered under the same key is kept under a fresh
    /// sequence key, like a displaced record.
    pub fn add_pending_value(
        &self,
        sensor_type_id: u64,
        method_id: u64,
        prefix: Option<&str>,
        holder: Arc<dyn PendingValue>,
    ) {
        let key = RecordKey::method(sensor_type_id, method_id, prefix);
        {
            let guard = self.roles.enter();
            let holders = &self.pending[guard.slot()];
            if let Some(displaced) = holders.insert(key, holder) {
                holders.insert(self.next_sequence_key(), displaced);
            }
        }
        self.notify_listeners();
    }

    /// Returns the holder registered under the method key, if any.
    pub fn pending_value(
        &self,
        sensor_type_id: u64,
        method_id: u64,
        prefix: Option<&str>,
    ) -> Option<Arc<dyn PendingValue>> {
        let key = RecordKey::method(sensor_type_id, method_id, prefix);
        let guard = self.roles.enter();
        self.pending[guard.slot()]
            .get(&key)
            .map(|h| Arc::clone(h.value()))
    }

    /// Registers a pending-count listener. Returns `false` if already registered.
    pub fn register_listener(&self, listener: Arc<dyn CountListener>) -> bool {
        self.listeners.register(listener)
    }

    /// Removes a pending-count listener. Returns `false` if it was not registered.
    pub fn unregister_listener(&self, listener: &Arc<dyn CountListener>) -> bool {
        self.listeners.unregister(listener)
    }

    /// Swaps the active and processing roles and flattens the retired buffers
    /// into one batch.
    ///
    /// Pending-value holders are finalized here, exactly once. Returns `None`
    /// when nothing was pending at swap time. Calls are serialized internally,
    /// but the dispatcher only ever makes them from one thread at a time.
    pub fn swap_and_drain(&self) -> Option<Vec<Record>> {
        let _exclusive = self.drain.lock();

        let active = self.roles.active();
        if self.records[active].is_empty() && self.pending[active].is_empty() {
            return None;
        }

        let slot = self.roles.exchange();
        let records = &self.records[slot];
        let holders = &self.pending[slot];
        let mut batch = Vec::with_capacity(records.len() + holders.len());

        let keys: Vec<RecordKey> = records.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            if let Some((_, record)) = records.remove(&key) {
                batch.push(record);
            }
        }

        let keys: Vec<RecordKey> = holders.iter().map(|e| e.key().clone()).collect();
        for key in keys {
            let Some((key, holder)) = holders.remove(&key) else {
                continue;
            };
            match catch_unwind(AssertUnwindSafe(|| holder.finalize())) {
                Ok(record) => batch.push(record),
                Err(_) => log::error!("Pending value {key} panicked while finalizing, dropping it."),
            }
        }

        log::trace!("Drained {} records from slot {slot}.", batch.len());
        Some(batch)
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("active_slot", &self.roles.active())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl RecordSink for RecordStore {
    fn put(&self, key: RecordKey, record: Record) {
        {
            let guard = self.roles.enter();
            let records = &self.records[guard.slot()];
            if let Some(displaced) = records.insert(key, record) {
                records.insert(self.next_sequence_key(), displaced);
            }
        }
        self.notify_listeners();
    }

    fn add_exception_record(&self, data: ExceptionData) {
        let key = RecordKey::exception(data.sensor_type_id, data.identity_hash);
        let is_creation = data.is_creation();
        self.put_if_first(key, Record::Exception(data), is_creation);
    }

    fn add_eum_event(&self, event: EumEvent) {
        self.put(self.next_sequence_key(), Record::Eum(event));
    }
}
