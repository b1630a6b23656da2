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

#![doc = include_str!("../../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! packetwire is organized into two layers:
//!
//! - **[`codec`]**: The wire format. Packet headers, payload encoding with
//!   optional deflate compression, and the bounded readers that keep a
//!   connection aligned to packet boundaries.
//! - **[`transport`]**: The transaction state machines, the locks that
//!   serialize callers, and the adapters that obtain a raw byte stream (TCP,
//!   a spawned peer process, in-memory pipes).
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`transport::TransportError`]. Use
//! [`TransportError::should_close_transport`](transport::TransportError::should_close_transport)
//! to decide whether a failure left the connection unusable.
//!
//! ## Logging
//!
//! packetwire emits [`tracing`] events at transaction boundaries (`trace`),
//! on connection lifecycle changes (`debug`/`info`) and on failures
//! (`warn`). Install any `tracing` subscriber to see them.

pub mod codec;
pub mod transport;

pub use transport::{MemoryTransport, PacketTransport, SocketTransport, Transport, TransportError};
