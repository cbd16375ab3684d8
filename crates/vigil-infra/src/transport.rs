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

//! A transport that writes every batch as one JSON line.

use parking_lot::Mutex;
use serde::Serialize;
use std::io::{self, Write};
use vigil_core::{now_millis, ConnectivityMonitor, Record, Transport, TransportError};

#[derive(Serialize)]
struct Envelope<'a> {
    sent_at_ms: u64,
    records: &'a [Record],
}

/// Writes batches to any [`Write`] sink, one JSON object per line.
///
/// Useful as a local collector, for example `stdout` or a spool file. A
/// failed write marks the transport disconnected; [`reconnect`](Self::reconnect)
/// wakes the sending worker again.
pub struct JsonLinesTransport<W: Write + Send> {
    connectivity: ConnectivityMonitor,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesTransport<W> {
    /// Creates a connected transport over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            connectivity: ConnectivityMonitor::new(true),
            writer: Mutex::new(writer),
        }
    }

    /// Marks the transport connected again.
    pub fn reconnect(&self) {
        self.connectivity.set_connected(true);
    }

    /// Consumes the transport and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

fn classify(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            TransportError::ServerUnreachable { timeout: true }
        }
        io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected => TransportError::ServerUnreachable { timeout: false },
        _ => TransportError::Other(anyhow::Error::new(err).context("writing batch")),
    }
}

impl<W: Write + Send> Transport for JsonLinesTransport<W> {
    fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    fn send(&self, batch: &[Record]) -> Result<(), TransportError> {
        let envelope = Envelope {
            sent_at_ms: now_millis(),
            records: batch,
        };
        let mut line =
            serde_json::to_vec(&envelope).map_err(|e| TransportError::Rejected(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock();
        let written = writer.write_all(&line).and_then(|()| writer.flush());
        drop(writer);

        written.map_err(|err| {
            let err = classify(err);
            if matches!(err, TransportError::ServerUnreachable { timeout: false }) {
                self.connectivity.set_connected(false);
            }
            err
        })
    }
}
