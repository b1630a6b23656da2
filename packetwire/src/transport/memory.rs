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

//! In-memory transport implementation for testing.
//!
//! This module provides a blocking in-process byte pipe and a transport pair
//! built on it. It's primarily useful for testing and benchmarking without
//! the overhead of actual network I/O.

use crate::transport::{
    PacketTransport, RawStream, StreamShutdown, Transport, TransportConfig, TransportMetadata,
    TransportWrapper,
};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct PipeState {
    buffer: VecDeque<u8>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Pipe {
    state: Mutex<PipeState>,
    readable: Condvar,
}

impl Pipe {
    fn close(&self) {
        self.state.lock().closed = true;
        self.readable.notify_all();
    }
}

/// Reading end of an in-memory pipe.
///
/// Reads block until data is available. Once the pipe is closed, buffered
/// data is still delivered, then reads return end-of-stream.
#[derive(Debug)]
pub struct PipeReader {
    pipe: Arc<Pipe>,
}

/// Writing end of an in-memory pipe.
///
/// Writes never block. Writing to a closed pipe fails with `BrokenPipe`.
#[derive(Debug)]
pub struct PipeWriter {
    pipe: Arc<Pipe>,
}

/// Creates a unidirectional in-memory pipe.
///
/// Dropping either end closes the pipe.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::memory::pipe;
/// use std::io::{Read, Write};
///
/// let (mut writer, mut reader) = pipe();
/// writer.write_all(b"abc").unwrap();
/// drop(writer);
///
/// let mut out = Vec::new();
/// reader.read_to_end(&mut out).unwrap();
/// assert_eq!(out, b"abc");
/// ```
pub fn pipe() -> (PipeWriter, PipeReader) {
    let pipe = Arc::new(Pipe::default());
    (
        PipeWriter {
            pipe: Arc::clone(&pipe),
        },
        PipeReader { pipe },
    )
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = self.pipe.state.lock();
        while state.buffer.is_empty() && !state.closed {
            self.pipe.readable.wait(&mut state);
        }
        let n = buf.len().min(state.buffer.len());
        for (slot, byte) in buf.iter_mut().zip(state.buffer.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Drop for PipeReader {
    fn drop(&mut self) {
        self.pipe.close();
    }
}

impl Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.pipe.state.lock();
        if state.closed {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "in-memory pipe is closed",
            ));
        }
        state.buffer.extend(buf);
        drop(state);
        self.pipe.readable.notify_all();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        self.pipe.close();
    }
}

/// Closes both pipes of one side of a memory transport pair.
struct PipeShutdown {
    incoming: Arc<Pipe>,
    outgoing: Arc<Pipe>,
}

impl StreamShutdown for PipeShutdown {
    fn shutdown(&self) -> io::Result<()> {
        self.incoming.close();
        self.outgoing.close();
        Ok(())
    }
}

/// In-memory transport.
///
/// `MemoryTransport` connects two [`PacketTransport`]s through a pair of
/// in-process pipes. This is useful for:
///
/// - Unit testing without network overhead
/// - Benchmarking pure protocol performance
/// - Running both ends of a protocol in one process
///
/// Closing either side wakes any thread blocked reading on it, and the peer
/// sees end-of-stream once it has consumed what was already sent.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::{MemoryTransport, Transport};
/// use std::thread;
///
/// # fn main() -> Result<(), packetwire::transport::TransportError> {
/// let (client, server) = MemoryTransport::pair();
///
/// let echo = thread::spawn(move || -> Result<(), packetwire::transport::TransportError> {
///     let seq = server.begin_read()?;
///     let mut buf = vec![0u8; server.remaining()? as usize];
///     server.read(&mut buf)?;
///     server.end_read()?;
///
///     server.begin_write(seq)?;
///     server.write(&buf)?;
///     server.end_write()
/// });
///
/// client.begin_write(9)?;
/// client.write(b"echo")?;
/// client.end_write()?;
///
/// assert_eq!(client.begin_read()?, 9);
/// let mut reply = [0u8; 4];
/// client.read(&mut reply)?;
/// client.end_read()?;
/// assert_eq!(&reply, b"echo");
///
/// echo.join().unwrap()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    inner: PacketTransport,
}

impl MemoryTransport {
    /// Creates a pair of connected memory transports with the default
    /// configuration.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_config(TransportConfig::default())
    }

    /// Creates a pair of connected memory transports sharing `config`.
    pub fn pair_with_config(config: TransportConfig) -> (Self, Self) {
        let (a_to_b_writer, a_to_b_reader) = pipe();
        let (b_to_a_writer, b_to_a_reader) = pipe();

        let a_shutdown = PipeShutdown {
            incoming: Arc::clone(&b_to_a_reader.pipe),
            outgoing: Arc::clone(&a_to_b_writer.pipe),
        };
        let b_shutdown = PipeShutdown {
            incoming: Arc::clone(&a_to_b_reader.pipe),
            outgoing: Arc::clone(&b_to_a_writer.pipe),
        };

        let a = PacketTransport::new(
            RawStream::new(b_to_a_reader, a_to_b_writer).with_shutdown(a_shutdown),
            config.clone(),
            TransportMetadata::new("memory"),
        );
        let b = PacketTransport::new(
            RawStream::new(a_to_b_reader, b_to_a_writer).with_shutdown(b_shutdown),
            config,
            TransportMetadata::new("memory"),
        );

        debug!(
            transport1_id = %a.metadata().id,
            transport2_id = %b.metadata().id,
            "created memory transport pair"
        );

        (Self { inner: a }, Self { inner: b })
    }
}

impl TransportWrapper for MemoryTransport {
    type Inner = PacketTransport;

    fn inner(&self) -> &PacketTransport {
        &self.inner
    }
}
