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

//! Observable lifecycle states of the dispatch workers.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of the preparation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreparationState {
    /// Blocked until the next flush request.
    Waiting,
    /// Swapping the store and forwarding the batch.
    Preparing,
    /// Stop requested; no new cycle will start.
    Stopping,
}

/// State of the sending worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendingState {
    /// Nothing is ready to send.
    Idle,
    /// Batches are ready but the transport is disconnected.
    WaitingConnection,
    /// Draining ready batches into the transport.
    Sending,
    /// The worker has left its loop.
    Stopped,
}

/// Conversion between a worker state and its stored byte.
pub(crate) trait StateByte: Copy {
    fn to_byte(self) -> u8;
    fn from_byte(byte: u8) -> Self;
}

impl StateByte for PreparationState {
    fn to_byte(self) -> u8 {
        match self {
            Self::Waiting => 0,
            Self::Preparing => 1,
            Self::Stopping => 2,
        }
    }

    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Waiting,
            1 => Self::Preparing,
            _ => Self::Stopping,
        }
    }
}

impl StateByte for SendingState {
    fn to_byte(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::WaitingConnection => 1,
            Self::Sending => 2,
            Self::Stopped => 3,
        }
    }

    fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Idle,
            1 => Self::WaitingConnection,
            2 => Self::Sending,
            _ => Self::Stopped,
        }
    }
}

/// Lock-free cell holding a worker state, shared with the dispatcher.
#[derive(Debug)]
pub(crate) struct StateCell<S> {
    byte: AtomicU8,
    _state: PhantomData<fn() -> S>,
}

impl<S: StateByte> StateCell<S> {
    pub(crate) fn new(initial: S) -> Self {
        Self {
            byte: AtomicU8::new(initial.to_byte()),
            _state: PhantomData,
        }
    }

    pub(crate) fn get(&self) -> S {
        S::from_byte(self.byte.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: S) {
        self.byte.store(state.to_byte(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_round_trips_every_state() {
        let cell = StateCell::new(SendingState::Idle);
        for state in [
            SendingState::WaitingConnection,
            SendingState::Sending,
            SendingState::Stopped,
            SendingState::Idle,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }

    #[test]
    fn preparation_cell_starts_waiting() {
        let cell = StateCell::new(PreparationState::Waiting);
        assert_eq!(cell.get(), PreparationState::Waiting);
        cell.set(PreparationState::Stopping);
        assert_eq!(cell.get(), PreparationState::Stopping);
    }
}
