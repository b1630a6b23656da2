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

//! `std::io` views over transactions.
//!
//! The views do not begin transactions. They let code written against
//! [`std::io::Read`] and [`std::io::Write`] consume or produce the payload
//! of a transaction the caller has already begun, and end it on
//! [`close`](InputStream::close).

use crate::transport::{Transport, TransportError};
use std::io::{self, Read, Write};

/// A [`Read`] view of the current read transaction.
///
/// Reads are capped to the bytes left in the packet, so `read_to_end` and
/// friends stop at the packet boundary instead of failing with an overread.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::{MemoryTransport, Transport};
/// use std::io::{Read, Write};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let (client, server) = MemoryTransport::pair();
///
/// client.begin_write(5)?;
/// let mut out = client.output_stream();
/// out.write_all(b"hello, ")?;
/// out.write_all(b"world")?;
/// out.close()?;
///
/// assert_eq!(server.begin_read()?, 5);
/// let mut input = server.input_stream();
/// let mut text = String::new();
/// input.read_to_string(&mut text)?;
/// input.close()?;
///
/// assert_eq!(text, "hello, world");
/// # Ok(())
/// # }
/// ```
pub struct InputStream<'a> {
    transport: &'a dyn Transport,
}

impl<'a> InputStream<'a> {
    /// Creates a view over `transport`'s read side.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Ends the read transaction.
    pub fn close(self) -> Result<(), TransportError> {
        self.transport.end_read()
    }
}

impl Read for InputStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.transport.remaining()?;
        let cap = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        if cap == 0 {
            return Ok(0);
        }
        Ok(self.transport.read(&mut buf[..cap])?)
    }
}

impl std::fmt::Debug for InputStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("transport_id", &self.transport.metadata().id)
            .finish()
    }
}

/// A [`Write`] view of the current write transaction.
///
/// Writes are buffered by the transport. `flush` does nothing; the packet is
/// sent when the view is [closed](OutputStream::close).
pub struct OutputStream<'a> {
    transport: &'a dyn Transport,
}

impl<'a> OutputStream<'a> {
    /// Creates a view over `transport`'s write side.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Sends the packet and ends the write transaction.
    pub fn close(self) -> Result<(), TransportError> {
        self.transport.end_write()
    }

    /// Ends the write transaction without sending anything.
    pub fn cancel(self) -> Result<(), TransportError> {
        self.transport.cancel_write()
    }
}

impl Write for OutputStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.transport.write(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for OutputStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("transport_id", &self.transport.metadata().id)
            .finish()
    }
}
