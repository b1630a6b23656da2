//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The packet transport.
//!
//! [`PacketTransport`] frames packets over a [`RawStream`] and implements
//! the read and write transaction state machines of [`Transport`].
//!
//! Each direction has a [`TransactionLock`] deciding which thread may drive
//! it, and a mutex around the state the transaction works on. The state
//! mutex is only held for the duration of a single call; the transaction
//! lock is held from `begin_*` to the terminal call.
//!
//! Only the transaction owner and `close` touch a state mutex. `close` never
//! waits for it: if the owner is inside a call (possibly blocked on the raw
//! stream), the owner discards the state itself once the call returns.

use crate::codec::{PacketHeader, PacketReader, encode_packet};
use crate::transport::{
    RawInput, RawOutput, RawStream, StreamShutdown, TransactionLock, Transport, TransportConfig,
    TransportError, TransportMetadata,
};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use tracing::{debug, instrument, trace, warn};

/// Threshold value meaning compression is off.
const COMPRESSION_DISABLED: i32 = -1;

/// Read side: the connection input, or the cursor that currently owns it.
struct ReadState {
    input: Option<RawInput>,
    cursor: Option<PacketReader<RawInput>>,
}

impl ReadState {
    fn discard(&mut self) {
        self.cursor = None;
        self.input = None;
    }
}

/// Write side: the connection output and the reusable buffers.
struct WriteState {
    output: Option<RawOutput>,
    sequence: i32,
    buffer: Vec<u8>,
    frame: Vec<u8>,
}

impl WriteState {
    fn discard(&mut self) {
        self.output = None;
        self.buffer.clear();
        self.frame.clear();
    }
}

/// A transport framing packets over a raw byte stream.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::{
///     PacketTransport, RawStream, ThresholdCompression, Transport, TransportConfig,
///     TransportMetadata,
/// };
/// use std::io::{Cursor, sink};
/// use std::sync::Arc;
///
/// let config = TransportConfig::new()
///     .with_compression_policy(Arc::new(ThresholdCompression(1024)));
/// let transport = PacketTransport::new(
///     RawStream::new(Cursor::new(Vec::new()), sink()),
///     config,
///     TransportMetadata::new("example"),
/// );
///
/// assert!(!transport.is_compression_enabled());
/// assert!(transport.enable_compression().unwrap());
/// assert_eq!(transport.compression_threshold(), 1024);
/// ```
pub struct PacketTransport {
    metadata: TransportMetadata,
    config: TransportConfig,
    threshold: AtomicI32,
    closed: AtomicBool,
    shutdown: Option<Box<dyn StreamShutdown>>,
    read_lock: TransactionLock,
    write_lock: TransactionLock,
    read_state: Mutex<ReadState>,
    write_state: Mutex<WriteState>,
}

impl PacketTransport {
    /// Creates a transport over `stream`.
    ///
    /// Compression starts disabled regardless of the configured policy.
    pub fn new(stream: RawStream, config: TransportConfig, metadata: TransportMetadata) -> Self {
        let RawStream {
            input,
            output,
            shutdown,
        } = stream;
        let capacity = config.initial_buffer_size();

        debug!(
            transport_id = %metadata.id,
            transport_type = %metadata.transport_type,
            ?config,
            "created packet transport"
        );

        Self {
            metadata,
            config,
            threshold: AtomicI32::new(COMPRESSION_DISABLED),
            closed: AtomicBool::new(false),
            shutdown,
            read_lock: TransactionLock::new(),
            write_lock: TransactionLock::new(),
            read_state: Mutex::new(ReadState {
                input: Some(input),
                cursor: None,
            }),
            write_state: Mutex::new(WriteState {
                output: Some(output),
                sequence: 0,
                buffer: Vec::with_capacity(capacity),
                frame: Vec::with_capacity(capacity),
            }),
        }
    }

    /// Creates a transport over `stream` with the default configuration.
    pub fn from_stream(stream: RawStream) -> Self {
        Self::new(
            stream,
            TransportConfig::default(),
            TransportMetadata::new("stream"),
        )
    }

    /// Returns the configuration this transport was built with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the active compression threshold, or a negative value when
    /// compression is disabled.
    pub fn compression_threshold(&self) -> i32 {
        self.threshold.load(Ordering::SeqCst)
    }

    /// Fails with `Closed` once the transport is closed, dropping `lock` if
    /// the calling thread holds it.
    fn ensure_open(&self, lock: &TransactionLock) -> Result<(), TransportError> {
        if !self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        if lock.release() {
            trace!(transport_id = %self.metadata.id, "released transaction lock of closed transport");
        }
        Err(TransportError::Closed)
    }

    fn ensure_read_owner(&self, operation: &'static str) -> Result<(), TransportError> {
        if self.read_lock.is_held_by_current_thread() {
            Ok(())
        } else {
            Err(TransportError::ProtocolState {
                operation,
                transaction: "read",
            })
        }
    }

    fn ensure_write_owner(&self, operation: &'static str) -> Result<(), TransportError> {
        if self.write_lock.is_held_by_current_thread() {
            Ok(())
        } else {
            Err(TransportError::ProtocolState {
                operation,
                transaction: "write",
            })
        }
    }

    /// Drops the read state if the transport was closed while the owner was
    /// using it.
    fn settle_read_state(&self) {
        if self.closed.load(Ordering::SeqCst) {
            self.read_state.lock().discard();
        }
    }

    /// Drops the write state if the transport was closed while the owner was
    /// using it.
    fn settle_write_state(&self) {
        if self.closed.load(Ordering::SeqCst) {
            self.write_state.lock().discard();
        }
    }

    /// Reads the next header and installs a cursor over its payload.
    fn open_packet(&self) -> Result<PacketHeader, TransportError> {
        let result = {
            let mut state = self.read_state.lock();
            let mut input = state.input.take().ok_or(TransportError::Closed)?;
            let result = PacketHeader::read_from(&mut input, self.config.max_packet_size());
            if self.closed.load(Ordering::SeqCst) {
                // Closed while blocked on the header; the input goes with it.
                Err(TransportError::Closed)
            } else {
                match result {
                    Ok(header) => {
                        state.cursor = Some(PacketReader::open(input, &header));
                        Ok(header)
                    }
                    Err(error) => {
                        state.input = Some(input);
                        Err(error)
                    }
                }
            }
        };
        self.settle_read_state();
        result
    }

    /// Closes the cursor, handing the input back to the read state.
    fn finish_packet(&self, state: &mut ReadState) -> Result<(), TransportError> {
        let Some(cursor) = state.cursor.take() else {
            return Ok(());
        };
        let (input, result) = cursor.finish();
        if !self.closed.load(Ordering::SeqCst) {
            state.input = Some(input);
        }
        result
    }

    /// Encodes the buffered payload and hands the frame to the stream.
    fn send_packet(&self, state: &mut WriteState) -> Result<(), TransportError> {
        if state.buffer.is_empty() {
            trace!(transport_id = %self.metadata.id, "empty write transaction, nothing sent");
            return Ok(());
        }

        let WriteState {
            output,
            sequence,
            buffer,
            frame,
        } = state;
        let output = output.as_mut().ok_or(TransportError::Closed)?;
        let header = encode_packet(
            *sequence,
            buffer.as_slice(),
            self.compression_threshold(),
            self.config.compression(),
            frame,
        )?;
        let result = output.write_all(frame.as_slice()).and_then(|_| output.flush());
        frame.clear();
        result?;

        trace!(
            transport_id = %self.metadata.id,
            sequence = header.sequence,
            packet_length = header.packet_length,
            uncompressed_length = header.uncompressed_length,
            "sent packet"
        );
        Ok(())
    }
}

impl Transport for PacketTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    #[instrument(level = "trace", skip(self), fields(transport_id = %self.metadata.id))]
    fn begin_read(&self) -> Result<i32, TransportError> {
        self.ensure_open(&self.read_lock)?;
        self.read_lock.acquire("begin_read")?;
        self.ensure_open(&self.read_lock)?;

        match self.open_packet() {
            Ok(header) => {
                trace!(
                    sequence = header.sequence,
                    packet_length = header.packet_length,
                    uncompressed_length = header.uncompressed_length,
                    "began read transaction"
                );
                Ok(header.sequence)
            }
            Err(error) => {
                self.read_lock.release();
                debug!(%error, "failed to begin read transaction");
                Err(error)
            }
        }
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.ensure_open(&self.read_lock)?;
        self.ensure_read_owner("read")?;

        let result = {
            let mut state = self.read_state.lock();
            let result = match state.cursor.as_mut() {
                Some(cursor) => cursor.read_bounded(buf),
                None => Err(TransportError::Closed),
            };
            if let Err(error) = &result {
                if !matches!(error, TransportError::Overread { .. }) {
                    if let Err(drain_error) = self.finish_packet(&mut state) {
                        trace!(transport_id = %self.metadata.id, %drain_error, "failed to drain aborted packet");
                    }
                }
            }
            result
        };
        self.settle_read_state();

        match result {
            Ok(n) => {
                trace!(transport_id = %self.metadata.id, requested = buf.len(), read = n, "read payload");
                Ok(n)
            }
            // Misuse: the cursor has not moved, the transaction stays open.
            Err(error @ TransportError::Overread { .. }) => Err(error),
            Err(error) => {
                self.read_lock.release();
                warn!(transport_id = %self.metadata.id, %error, "read transaction aborted");
                Err(error)
            }
        }
    }

    fn remaining(&self) -> Result<u64, TransportError> {
        self.ensure_open(&self.read_lock)?;
        self.ensure_read_owner("remaining")?;
        let remaining = self
            .read_state
            .lock()
            .cursor
            .as_ref()
            .map(PacketReader::remaining)
            .ok_or(TransportError::Closed);
        self.settle_read_state();
        remaining
    }

    #[instrument(level = "trace", skip(self), fields(transport_id = %self.metadata.id))]
    fn end_read(&self) -> Result<(), TransportError> {
        self.ensure_open(&self.read_lock)?;
        self.ensure_read_owner("end_read")?;

        let result = self.finish_packet(&mut self.read_state.lock());
        self.settle_read_state();
        self.read_lock.release();
        match &result {
            Ok(()) => trace!("ended read transaction"),
            Err(error) => warn!(%error, "failed to skip unread payload"),
        }
        result
    }

    #[instrument(level = "trace", skip(self), fields(transport_id = %self.metadata.id))]
    fn begin_write(&self, sequence: i32) -> Result<(), TransportError> {
        self.ensure_open(&self.write_lock)?;
        self.write_lock.acquire("begin_write")?;
        self.ensure_open(&self.write_lock)?;

        {
            let mut state = self.write_state.lock();
            state.sequence = sequence;
            state.buffer.clear();
        }
        self.settle_write_state();
        trace!("began write transaction");
        Ok(())
    }

    fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        self.ensure_open(&self.write_lock)?;
        self.ensure_write_owner("write")?;
        self.write_state.lock().buffer.extend_from_slice(data);
        self.settle_write_state();
        trace!(transport_id = %self.metadata.id, len = data.len(), "buffered payload");
        Ok(())
    }

    fn restart_write(&self) -> Result<(), TransportError> {
        self.ensure_open(&self.write_lock)?;
        self.ensure_write_owner("restart_write")?;
        self.write_state.lock().buffer.clear();
        self.settle_write_state();
        trace!(transport_id = %self.metadata.id, "restarted write transaction");
        Ok(())
    }

    #[instrument(level = "trace", skip(self), fields(transport_id = %self.metadata.id))]
    fn end_write(&self) -> Result<(), TransportError> {
        self.ensure_open(&self.write_lock)?;
        self.ensure_write_owner("end_write")?;

        let result = {
            let mut state = self.write_state.lock();
            let result = self.send_packet(&mut state);
            state.buffer.clear();
            result
        };
        self.settle_write_state();
        self.write_lock.release();
        if let Err(error) = &result {
            warn!(%error, "failed to send packet");
        }
        result
    }

    #[instrument(level = "trace", skip(self), fields(transport_id = %self.metadata.id))]
    fn cancel_write(&self) -> Result<(), TransportError> {
        self.ensure_open(&self.write_lock)?;
        self.ensure_write_owner("cancel_write")?;
        self.write_state.lock().buffer.clear();
        self.settle_write_state();
        self.write_lock.release();
        trace!("cancelled write transaction");
        Ok(())
    }

    fn enable_compression(&self) -> Result<bool, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let threshold = self.config.compression_policy().compression_threshold();
        let threshold = if threshold > 0 {
            threshold
        } else {
            COMPRESSION_DISABLED
        };
        self.threshold.store(threshold, Ordering::SeqCst);
        debug!(transport_id = %self.metadata.id, threshold, "enable compression");
        Ok(threshold > 0)
    }

    fn disable_compression(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.threshold.store(COMPRESSION_DISABLED, Ordering::SeqCst);
        debug!(transport_id = %self.metadata.id, "disabled compression");
        Ok(())
    }

    fn is_compression_enabled(&self) -> bool {
        self.compression_threshold() > 0
    }

    #[instrument(skip(self), fields(transport_id = %self.metadata.id))]
    fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("closing packet transport");

        // Interrupt blocked raw reads, if the stream supports it.
        let result = match &self.shutdown {
            Some(hook) => hook.shutdown().map_err(TransportError::from),
            None => Ok(()),
        };

        // A busy state belongs to a transaction owner inside a call; it
        // discards the state on its way out.
        if let Some(mut state) = self.read_state.try_lock() {
            state.discard();
        }
        if let Some(mut state) = self.write_state.try_lock() {
            state.discard();
        }
        self.read_lock.release();
        self.write_lock.release();

        match &result {
            Ok(()) => debug!("packet transport closed"),
            Err(error) => warn!(%error, "stream shutdown failed"),
        }
        result
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for PacketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketTransport")
            .field("metadata", &self.metadata)
            .field("compression_threshold", &self.compression_threshold())
            .field("closed", &self.is_closed())
            .field("read_locked", &self.read_lock.is_locked())
            .field("write_locked", &self.write_lock.is_locked())
            .finish_non_exhaustive()
    }
}
