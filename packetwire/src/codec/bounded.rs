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

//! Size-limited readers.
//!
//! A packet payload is exposed to the caller through a reader that knows
//! exactly how many bytes are left. Two adapters share the [`BoundedRead`]
//! abstraction:
//!
//! - [`DrainingReader`] sits directly on the connection. Closing it consumes
//!   whatever the caller left unread so the connection stays aligned to the
//!   next packet header.
//! - [`LimitedReader`] sits on top of a decompression filter. Closing it
//!   leaves the filter alone; the draining segment underneath is closed
//!   separately once the filter has been unwrapped.
//!
//! Both implement [`std::io::Read`] with *capped* semantics (a large buffer
//! is simply filled up to the limit), which is what a decompressor pulling
//! from the segment expects. Callers that must not ask for more than the
//! packet holds use [`BoundedRead::read_bounded`], which refuses instead.

use crate::transport::TransportError;
use std::io::{self, Read};

/// A byte source limited to a fixed number of remaining bytes.
pub trait BoundedRead: Read {
    /// Number of bytes that can still be read.
    fn remaining(&self) -> u64;

    /// Reads into `buf`, failing with [`TransportError::Overread`] when
    /// `buf` is longer than [`remaining`](Self::remaining).
    ///
    /// A refused read consumes nothing. A successful read may return fewer
    /// bytes than requested if the underlying source returned a short read.
    fn read_bounded(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let remaining = self.remaining();
        if buf.len() as u64 > remaining {
            return Err(TransportError::Overread {
                requested: buf.len(),
                remaining,
            });
        }
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            match self.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(classify_read_error(e)),
            }
        }
    }

    /// Closes the reader. Calling `close` more than once is a no-op.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Maps an I/O error raised while reading a payload onto the error taxonomy.
///
/// Corrupt or truncated compressed data surfaces from the decoder as
/// `InvalidData`/`InvalidInput`; everything else came from the connection.
pub(crate) fn classify_read_error(error: io::Error) -> TransportError {
    match error.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
            TransportError::codec_io("failed to decode packet payload", error)
        }
        _ => TransportError::Stream { source: error },
    }
}

/// Reads one bounded chunk, turning a premature end of input into `eof_kind`.
fn read_capped<R: Read>(
    inner: &mut R,
    remaining: &mut u64,
    buf: &mut [u8],
    eof_kind: io::ErrorKind,
) -> io::Result<usize> {
    if *remaining == 0 || buf.is_empty() {
        return Ok(0);
    }
    let cap = buf.len().min(usize::try_from(*remaining).unwrap_or(usize::MAX));
    let n = inner.read(&mut buf[..cap])?;
    if n == 0 {
        return Err(io::Error::new(
            eof_kind,
            format!("source ended with {} bytes still expected", remaining),
        ));
    }
    *remaining -= n as u64;
    Ok(n)
}

/// A bounded segment of the raw connection.
///
/// Closing drains the rest of the segment.
#[derive(Debug)]
pub struct DrainingReader<R> {
    inner: R,
    remaining: u64,
    closed: bool,
}

impl<R: Read> DrainingReader<R> {
    /// Creates a reader exposing the next `limit` bytes of `inner`.
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
            closed: false,
        }
    }

    /// Returns the underlying source.
    ///
    /// Unless [`close`](BoundedRead::close) succeeded first, the source may
    /// still be positioned in the middle of the segment.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for DrainingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_capped(
            &mut self.inner,
            &mut self.remaining,
            buf,
            io::ErrorKind::UnexpectedEof,
        )
    }
}

impl<R: Read> BoundedRead for DrainingReader<R> {
    fn remaining(&self) -> u64 {
        self.remaining
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.remaining > 0 {
            let expected = self.remaining;
            let drained = io::copy(self, &mut io::sink())?;
            tracing::trace!(drained, expected, "drained unread packet payload");
        }
        Ok(())
    }
}

/// A bounded view over a source it does not own.
///
/// Closing only marks the view as finished.
#[derive(Debug)]
pub struct LimitedReader<R> {
    inner: R,
    remaining: u64,
    closed: bool,
}

impl<R: Read> LimitedReader<R> {
    /// Creates a view exposing the next `limit` bytes of `inner`.
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
            closed: false,
        }
    }

    /// Returns the wrapped source.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_capped(
            &mut self.inner,
            &mut self.remaining,
            buf,
            io::ErrorKind::InvalidData,
        )
    }
}

impl<R: Read> BoundedRead for LimitedReader<R> {
    fn remaining(&self) -> u64 {
        if self.closed { 0 } else { self.remaining }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}
