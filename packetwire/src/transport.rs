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

//! Transactional packet transports.
//!
//! This module provides the [`Transport`] trait, the transaction-driven
//! interface an RPC layer uses to exchange packets, and its implementations:
//!
//! - [`PacketTransport`]: the framing engine over any [`RawStream`]
//! - [`SocketTransport`]: TCP with buffered I/O and `TCP_NODELAY`
//! - [`ProcTransport`]: a socket to a child process it spawned
//! - [`MemoryTransport`]: in-process pipes for tests and in-process use
//! - [`WrappedTransport`]: a pass-through layer over any transport
//!
//! # Architecture
//!
//! A transport moves whole packets, each tagged with a caller-chosen
//! sequence number. Sending and receiving are bracketed by transactions:
//!
//! ```text
//! begin_write(seq) -> write* -> restart_write? -> end_write | cancel_write
//! begin_read()     -> read*                    -> end_read
//! ```
//!
//! Only one thread at a time may run a read transaction, and only one a
//! write transaction; the two directions are independent. Nothing reaches
//! the wire until `end_write`, which sends the packet as one frame.
//!
//! Layering is done with [`TransportWrapper`]: implement `inner()` and every
//! [`Transport`] operation is forwarded.
//!
//! # Examples
//!
//! ## Request and response over an in-memory pair
//!
//! ```rust
//! use packetwire::transport::{MemoryTransport, Transport};
//! use std::sync::Arc;
//! use std::thread;
//!
//! # fn main() -> Result<(), packetwire::transport::TransportError> {
//! let (client, server) = MemoryTransport::pair();
//! let server = Arc::new(server);
//!
//! let handler = {
//!     let server = Arc::clone(&server);
//!     thread::spawn(move || -> Result<(), packetwire::transport::TransportError> {
//!         let seq = server.begin_read()?;
//!         let mut request = vec![0u8; server.remaining()? as usize];
//!         server.read(&mut request)?;
//!         server.end_read()?;
//!
//!         request.reverse();
//!         server.begin_write(seq)?;
//!         server.write(&request)?;
//!         server.end_write()
//!     })
//! };
//!
//! client.begin_write(100)?;
//! client.write(b"stressed")?;
//! client.end_write()?;
//!
//! assert_eq!(client.begin_read()?, 100);
//! let mut reply = [0u8; 8];
//! client.read(&mut reply)?;
//! client.end_read()?;
//! assert_eq!(&reply, b"desserts");
//!
//! handler.join().unwrap()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! ```rust
//! use packetwire::transport::{MemoryTransport, Transport, TransportError};
//!
//! let (client, _server) = MemoryTransport::pair();
//! match client.write(b"outside a transaction") {
//!     Err(TransportError::ProtocolState { operation, transaction }) => {
//!         assert_eq!(operation, "write");
//!         assert_eq!(transaction, "write");
//!     }
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

mod config;
mod error;
mod lock;
pub mod memory;
mod packet;
mod process;
mod stream;
pub mod tcp;
mod traits;
mod types;
mod view;
mod wrapped;

pub use self::config::{
    CompressionPolicy, DEFAULT_COMPRESSION_LEVEL, DEFAULT_INITIAL_BUFFER_SIZE, NoCompression,
    ThresholdCompression, TransportConfig,
};
pub use self::error::TransportError;
pub use self::lock::TransactionLock;
pub use self::memory::MemoryTransport;
pub use self::packet::PacketTransport;
pub use self::process::{LIBRARY_MODE_ARGS, ProcTransport, STARTUP_MARKER};
pub use self::stream::{RawInput, RawOutput, RawStream, StreamShutdown};
pub use self::tcp::SocketTransport;
pub use self::traits::{Transport, TransportWrapper};
pub use self::types::{TransportId, TransportMetadata};
pub use self::view::{InputStream, OutputStream};
pub use self::wrapped::WrappedTransport;
