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

//! Core transport trait definitions.

use crate::transport::{InputStream, OutputStream, TransportError, TransportMetadata};

/// A packet transport driven through read and write transactions.
///
/// All operations take `&self`; a transport is shared between threads (for
/// example behind an [`Arc`](std::sync::Arc)) and serializes them with two
/// independent transaction locks, one per direction.
///
/// # Read transactions
///
/// [`begin_read`](Self::begin_read) blocks until the read lock is free and a
/// packet header has arrived, then returns the packet's sequence number.
/// [`read`](Self::read) pulls payload bytes, and [`end_read`](Self::end_read)
/// discards whatever was left unread and releases the lock.
///
/// # Write transactions
///
/// [`begin_write`](Self::begin_write) takes the write lock and records the
/// sequence number. [`write`](Self::write) buffers payload bytes in memory.
/// The transaction ends with [`end_write`](Self::end_write), which frames
/// and sends the buffered bytes as one packet, or
/// [`cancel_write`](Self::cancel_write), which sends nothing.
/// [`restart_write`](Self::restart_write) drops the buffered bytes but keeps
/// the transaction open.
///
/// # Locking
///
/// The locks are owned by threads, not guards. A thread that begins a second
/// transaction of the same kind gets [`TransportError::Reentrancy`]; calling
/// a transaction operation without having begun one gets
/// [`TransportError::ProtocolState`].
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::{MemoryTransport, Transport};
///
/// # fn main() -> Result<(), packetwire::transport::TransportError> {
/// let (client, server) = MemoryTransport::pair();
///
/// client.begin_write(1)?;
/// client.write(b"ping")?;
/// client.end_write()?;
///
/// let seq = server.begin_read()?;
/// let mut buf = [0u8; 4];
/// server.read(&mut buf)?;
/// server.end_read()?;
///
/// assert_eq!(seq, 1);
/// assert_eq!(&buf, b"ping");
/// # Ok(())
/// # }
/// ```
pub trait Transport: Send + Sync {
    /// Returns metadata about this transport.
    fn metadata(&self) -> &TransportMetadata;

    /// Begins a read transaction and returns the incoming packet's sequence
    /// number.
    fn begin_read(&self) -> Result<i32, TransportError>;

    /// Reads payload bytes of the current packet into `buf`.
    ///
    /// Returns the number of bytes read, which may be less than `buf.len()`.
    /// Asking for more than [`remaining`](Self::remaining) fails with
    /// [`TransportError::Overread`] and leaves the packet untouched.
    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Returns the number of unread payload bytes in the current packet.
    fn remaining(&self) -> Result<u64, TransportError>;

    /// Ends the read transaction, discarding any unread payload.
    fn end_read(&self) -> Result<(), TransportError>;

    /// Begins a write transaction for a packet with the given sequence number.
    fn begin_write(&self, sequence: i32) -> Result<(), TransportError>;

    /// Appends `data` to the packet being written.
    fn write(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Discards everything written so far, keeping the transaction open.
    fn restart_write(&self) -> Result<(), TransportError>;

    /// Sends the buffered packet and ends the write transaction.
    ///
    /// Nothing is sent if nothing was written.
    fn end_write(&self) -> Result<(), TransportError>;

    /// Ends the write transaction without sending anything.
    fn cancel_write(&self) -> Result<(), TransportError>;

    /// Turns compression on, returning whether it is now active.
    ///
    /// Transports without compression support return `false`.
    fn enable_compression(&self) -> Result<bool, TransportError>;

    /// Turns compression off.
    fn disable_compression(&self) -> Result<(), TransportError>;

    /// Returns whether outgoing packets are currently compressed.
    fn is_compression_enabled(&self) -> bool;

    /// Closes the transport and releases the underlying stream.
    ///
    /// Closing twice is a no-op. Every later operation fails with
    /// [`TransportError::Closed`].
    fn close(&self) -> Result<(), TransportError>;

    /// Returns whether [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;

    /// Returns a [`std::io::Read`] view of the current read transaction.
    fn input_stream(&self) -> InputStream<'_>
    where
        Self: Sized,
    {
        InputStream::new(self)
    }

    /// Returns a [`std::io::Write`] view of the current write transaction.
    fn output_stream(&self) -> OutputStream<'_>
    where
        Self: Sized,
    {
        OutputStream::new(self)
    }
}

/// A transport layered over another transport.
///
/// Implementing this trait is enough to obtain a [`Transport`]: every
/// operation is forwarded to [`inner`](Self::inner) unchanged. Wrappers add
/// behavior around the connection (owning a child process, carrying extra
/// addressing) without touching the packet protocol.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::{MemoryTransport, Transport, TransportError, TransportWrapper};
///
/// struct Audited {
///     inner: MemoryTransport,
/// }
///
/// impl TransportWrapper for Audited {
///     type Inner = MemoryTransport;
///
///     fn inner(&self) -> &MemoryTransport {
///         &self.inner
///     }
///
///     fn on_close(&self) -> Result<(), TransportError> {
///         println!("closing {}", self.inner.metadata().id);
///         Ok(())
///     }
/// }
///
/// let (a, _b) = MemoryTransport::pair();
/// let audited = Audited { inner: a };
/// audited.close().unwrap();
/// assert!(audited.is_closed());
/// ```
pub trait TransportWrapper: Send + Sync {
    /// The wrapped transport type.
    type Inner: Transport;

    /// Returns the wrapped transport.
    fn inner(&self) -> &Self::Inner;

    /// Called once after the inner transport has been closed.
    fn on_close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<W: TransportWrapper> Transport for W {
    fn metadata(&self) -> &TransportMetadata {
        self.inner().metadata()
    }

    fn begin_read(&self) -> Result<i32, TransportError> {
        self.inner().begin_read()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.inner().read(buf)
    }

    fn remaining(&self) -> Result<u64, TransportError> {
        self.inner().remaining()
    }

    fn end_read(&self) -> Result<(), TransportError> {
        self.inner().end_read()
    }

    fn begin_write(&self, sequence: i32) -> Result<(), TransportError> {
        self.inner().begin_write(sequence)
    }

    fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        self.inner().write(data)
    }

    fn restart_write(&self) -> Result<(), TransportError> {
        self.inner().restart_write()
    }

    fn end_write(&self) -> Result<(), TransportError> {
        self.inner().end_write()
    }

    fn cancel_write(&self) -> Result<(), TransportError> {
        self.inner().cancel_write()
    }

    fn enable_compression(&self) -> Result<bool, TransportError> {
        self.inner().enable_compression()
    }

    fn disable_compression(&self) -> Result<(), TransportError> {
        self.inner().disable_compression()
    }

    fn is_compression_enabled(&self) -> bool {
        self.inner().is_compression_enabled()
    }

    fn close(&self) -> Result<(), TransportError> {
        let was_closed = self.inner().is_closed();
        let result = self.inner().close();
        if was_closed {
            return result;
        }
        result.and(self.on_close())
    }

    fn is_closed(&self) -> bool {
        self.inner().is_closed()
    }
}
