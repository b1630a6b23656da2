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

//! Packet framing for packetwire.
//!
//! Each packet on the wire is a fixed 12-byte header followed by its
//! payload:
//!
//! ```text
//! offset 0  : sequence number      (i32, big-endian)
//! offset 4  : packet length        (i32, big-endian, payload bytes on the wire)
//! offset 8  : uncompressed length  (i32, big-endian, 0 = raw payload)
//! offset 12 : payload              (packet length bytes)
//! ```
//!
//! A positive uncompressed length means the payload is a raw deflate
//! (RFC 1951) stream that inflates to exactly that many bytes.
//!
//! # Examples
//!
//! ```rust
//! use packetwire::codec::{decode_packet, encode_packet};
//! use flate2::Compression;
//!
//! let payload = vec![b'z'; 8192];
//! let mut frame = Vec::new();
//! let header = encode_packet(42, &payload, 4096, Compression::default(), &mut frame).unwrap();
//! assert!(header.is_compressed());
//!
//! let mut reader = &frame[..];
//! let (decoded_header, decoded) = decode_packet(&mut reader, None).unwrap();
//! assert_eq!(decoded_header.sequence, 42);
//! assert_eq!(decoded, payload);
//! ```

pub mod bounded;
mod header;
mod packet;

pub use self::bounded::{BoundedRead, DrainingReader, LimitedReader};
pub use self::header::{HEADER_SIZE, PacketHeader};
pub use self::packet::{PacketReader, decode_packet, encode_packet};
