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

//! The raw byte stream a transport frames packets over.
//!
//! A [`RawStream`] is an input half, an output half and an optional
//! [`StreamShutdown`] hook. The halves are used only inside transactions;
//! the hook is invoked by `close` without taking any transaction lock, so it
//! can interrupt a thread blocked in a read on the same connection.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

/// Input half of a raw stream.
pub type RawInput = Box<dyn Read + Send>;

/// Output half of a raw stream.
pub type RawOutput = Box<dyn Write + Send>;

/// Tears down the connection behind a [`RawStream`].
///
/// Implementations must be idempotent.
pub trait StreamShutdown: Send + Sync {
    /// Shuts the connection down in both directions.
    fn shutdown(&self) -> io::Result<()>;
}

impl StreamShutdown for TcpStream {
    fn shutdown(&self) -> io::Result<()> {
        match TcpStream::shutdown(self, Shutdown::Both) {
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            other => other,
        }
    }
}

/// A bidirectional byte stream split into halves.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::RawStream;
/// use std::io::{Cursor, sink};
///
/// let stream = RawStream::new(Cursor::new(Vec::new()), sink());
/// assert!(!stream.has_shutdown_hook());
/// ```
pub struct RawStream {
    pub(crate) input: RawInput,
    pub(crate) output: RawOutput,
    pub(crate) shutdown: Option<Box<dyn StreamShutdown>>,
}

impl RawStream {
    /// Creates a stream from separate input and output halves.
    pub fn new<R, W>(input: R, output: W) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            shutdown: None,
        }
    }

    /// Attaches a hook invoked when the owning transport is closed.
    pub fn with_shutdown(mut self, hook: impl StreamShutdown + 'static) -> Self {
        self.shutdown = Some(Box::new(hook));
        self
    }

    /// Returns `true` if a shutdown hook is attached.
    pub fn has_shutdown_hook(&self) -> bool {
        self.shutdown.is_some()
    }
}

impl std::fmt::Debug for RawStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawStream")
            .field("has_shutdown_hook", &self.shutdown.is_some())
            .finish_non_exhaustive()
    }
}
