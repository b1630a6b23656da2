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

//! The 12-byte packet header.
//!
//! ```text
//! +----------------+----------------------+---------------------------+
//! | Sequence (4)   | Packet length (4)    | Uncompressed length (4)   |
//! +----------------+----------------------+---------------------------+
//! ```
//!
//! All three fields are big-endian `i32`. An uncompressed length of zero
//! marks a raw payload; a positive value marks a deflate-compressed payload
//! and gives its inflated size.

use crate::transport::TransportError;
use std::io::{self, Read};

/// Size of the packet header in bytes.
pub const HEADER_SIZE: usize = 12;

/// Decoded packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Caller-assigned sequence number. Never validated.
    pub sequence: i32,
    /// Number of payload bytes following the header on the wire.
    pub packet_length: i32,
    /// Inflated size of a compressed payload, or `0` for a raw payload.
    pub uncompressed_length: i32,
}

impl PacketHeader {
    /// Header for a raw payload of `packet_length` bytes.
    pub fn raw(sequence: i32, packet_length: i32) -> Self {
        Self {
            sequence,
            packet_length,
            uncompressed_length: 0,
        }
    }

    /// Header for a compressed payload.
    pub fn compressed(sequence: i32, packet_length: i32, uncompressed_length: i32) -> Self {
        Self {
            sequence,
            packet_length,
            uncompressed_length,
        }
    }

    /// Returns `true` if the payload is deflate-compressed.
    pub fn is_compressed(&self) -> bool {
        self.uncompressed_length > 0
    }

    /// Number of payload bytes the reader will see after decompression.
    pub fn payload_length(&self) -> u64 {
        if self.is_compressed() {
            self.uncompressed_length as u64
        } else {
            self.packet_length as u64
        }
    }

    /// Encodes the header in network byte order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packetwire::codec::PacketHeader;
    ///
    /// let bytes = PacketHeader::raw(7, 5).encode();
    /// assert_eq!(&bytes[0..4], &7i32.to_be_bytes());
    /// assert_eq!(&bytes[4..8], &5i32.to_be_bytes());
    /// assert_eq!(&bytes[8..12], &[0, 0, 0, 0]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.sequence.to_be_bytes());
        bytes[4..8].copy_from_slice(&self.packet_length.to_be_bytes());
        bytes[8..12].copy_from_slice(&self.uncompressed_length.to_be_bytes());
        bytes
    }

    /// Decodes a header from its wire form without validating it.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        let field = |i: usize| i32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            sequence: field(0),
            packet_length: field(4),
            uncompressed_length: field(8),
        }
    }

    /// Reads and validates one header from `reader`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Stream`] if the stream fails or ends before all
    ///   twelve bytes arrive.
    /// - [`TransportError::Codec`] if the header is malformed (see
    ///   [`validate`](Self::validate)).
    pub fn read_from<R: Read + ?Sized>(
        reader: &mut R,
        max_packet_size: Option<u32>,
    ) -> Result<Self, TransportError> {
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes).map_err(|source| {
            if source.kind() == io::ErrorKind::UnexpectedEof {
                TransportError::Stream {
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("expected {} header bytes, stream ended", HEADER_SIZE),
                    ),
                }
            } else {
                TransportError::Stream { source }
            }
        })?;
        let header = Self::decode(&bytes);
        header.validate(max_packet_size)?;
        Ok(header)
    }

    /// Checks that both lengths are non-negative and within the limit.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Codec`] describing the first violation.
    pub fn validate(&self, max_packet_size: Option<u32>) -> Result<(), TransportError> {
        if self.packet_length < 0 {
            return Err(TransportError::codec(format!(
                "negative packet length {}",
                self.packet_length
            )));
        }
        if self.uncompressed_length < 0 {
            return Err(TransportError::codec(format!(
                "negative uncompressed length {}",
                self.uncompressed_length
            )));
        }
        if let Some(max) = max_packet_size {
            let largest = self.packet_length.max(self.uncompressed_length) as u32;
            if largest > max {
                return Err(TransportError::codec(format!(
                    "packet size {} exceeds maximum allowed size {}",
                    largest, max
                )));
            }
        }
        Ok(())
    }
}
