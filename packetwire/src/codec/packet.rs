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

//! Packet encoding and the payload cursor used on the read side.

use super::bounded::{BoundedRead, DrainingReader, LimitedReader, classify_read_error};
use super::header::{HEADER_SIZE, PacketHeader};
use crate::transport::TransportError;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::io::{Read, Write};

/// Cursor over the payload of the packet currently being read.
///
/// A raw payload is read straight from a [`DrainingReader`] over the
/// connection. A compressed payload inflates that same segment and exposes
/// the result through a [`LimitedReader`] sized to the declared
/// uncompressed length.
pub enum PacketReader<R: Read> {
    /// Payload sent verbatim.
    Raw(DrainingReader<R>),
    /// Deflate-compressed payload.
    Compressed(LimitedReader<DeflateDecoder<DrainingReader<R>>>),
}

impl<R: Read> PacketReader<R> {
    /// Opens a cursor over the payload described by `header`, taking over
    /// `source` until [`finish`](Self::finish) hands it back.
    pub fn open(source: R, header: &PacketHeader) -> Self {
        let segment = DrainingReader::new(source, header.packet_length as u64);
        if header.is_compressed() {
            PacketReader::Compressed(LimitedReader::new(
                DeflateDecoder::new(segment),
                header.uncompressed_length as u64,
            ))
        } else {
            PacketReader::Raw(segment)
        }
    }

    /// Bytes left for the caller to read.
    pub fn remaining(&self) -> u64 {
        match self {
            PacketReader::Raw(segment) => segment.remaining(),
            PacketReader::Compressed(view) => view.remaining(),
        }
    }

    /// Reads payload bytes, refusing requests larger than what remains.
    pub fn read_bounded(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self {
            PacketReader::Raw(segment) => segment.read_bounded(buf),
            PacketReader::Compressed(view) => view.read_bounded(buf),
        }
    }

    /// Closes the cursor and returns the source.
    ///
    /// The compressed view is closed first, then the decoder is unwrapped and
    /// the raw segment drained, so the source ends up positioned at the next
    /// packet header. The source is returned even when draining fails.
    ///
    /// A compressed payload that was read to the end must also end there: if
    /// the deflate stream still inflates to more bytes, the result is
    /// [`TransportError::Codec`].
    pub fn finish(self) -> (R, Result<(), TransportError>) {
        match self {
            PacketReader::Raw(mut segment) => {
                let result = segment.close();
                (segment.into_inner(), result)
            }
            PacketReader::Compressed(mut view) => {
                let fully_read = view.remaining() == 0;
                let view_result = view.close();
                let mut decoder = view.into_inner();
                let end_result = if fully_read {
                    ensure_inflated_end(&mut decoder)
                } else {
                    Ok(())
                };
                let mut segment = decoder.into_inner();
                let segment_result = segment.close();
                (
                    segment.into_inner(),
                    view_result.and(end_result).and(segment_result),
                )
            }
        }
    }
}

/// Fails if `decoder` inflates past the declared uncompressed length.
fn ensure_inflated_end<R: Read>(decoder: &mut DeflateDecoder<R>) -> Result<(), TransportError> {
    let mut extra = [0u8; 1];
    loop {
        match decoder.read(&mut extra) {
            Ok(0) => return Ok(()),
            Ok(_) => {
                return Err(TransportError::codec(
                    "compressed payload inflates past its declared length",
                ));
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(classify_read_error(e)),
        }
    }
}

impl<R: Read> std::fmt::Debug for PacketReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            PacketReader::Raw(_) => "raw",
            PacketReader::Compressed(_) => "compressed",
        };
        f.debug_struct("PacketReader")
            .field("kind", &kind)
            .field("remaining", &self.remaining())
            .finish()
    }
}

/// Encodes one packet into `frame`, replacing its contents.
///
/// The payload is deflated when `threshold` is positive and the payload is
/// at least `threshold` bytes long; otherwise it is copied verbatim. The
/// complete frame (header and payload) ends up contiguous in `frame`, so the
/// caller can hand it to the stream in a single write.
///
/// # Errors
///
/// Returns [`TransportError::Codec`] if the payload (or its compressed form)
/// does not fit the `i32` length fields, or if compression fails.
///
/// # Examples
///
/// ```rust
/// use packetwire::codec::{PacketHeader, encode_packet};
/// use flate2::Compression;
///
/// let mut frame = Vec::new();
/// let header = encode_packet(1, b"hello", -1, Compression::default(), &mut frame).unwrap();
/// assert_eq!(header, PacketHeader::raw(1, 5));
/// assert_eq!(&frame[12..], b"hello");
/// ```
pub fn encode_packet(
    sequence: i32,
    payload: &[u8],
    threshold: i32,
    level: Compression,
    frame: &mut Vec<u8>,
) -> Result<PacketHeader, TransportError> {
    let raw_length = i32::try_from(payload.len()).map_err(|_| {
        TransportError::codec(format!(
            "payload of {} bytes does not fit in a packet",
            payload.len()
        ))
    })?;

    frame.clear();
    frame.extend_from_slice(&[0u8; HEADER_SIZE]);

    let header = if threshold > 0 && raw_length >= threshold {
        let mut encoder = DeflateEncoder::new(&mut *frame, level);
        encoder
            .write_all(payload)
            .and_then(|_| encoder.try_finish())
            .map_err(|e| TransportError::codec_io("failed to compress packet payload", e))?;
        drop(encoder);
        let compressed_length = i32::try_from(frame.len() - HEADER_SIZE).map_err(|_| {
            TransportError::codec("compressed payload does not fit in a packet")
        })?;
        PacketHeader::compressed(sequence, compressed_length, raw_length)
    } else {
        frame.extend_from_slice(payload);
        PacketHeader::raw(sequence, raw_length)
    };

    frame[..HEADER_SIZE].copy_from_slice(&header.encode());
    Ok(header)
}

/// Read size used by [`decode_packet`].
const DECODE_CHUNK_SIZE: usize = 8 * 1024;

/// Reads one complete packet from `reader`.
///
/// This is the whole-packet counterpart of the cursor used by read
/// transactions, convenient for tooling and tests that just want the bytes.
pub fn decode_packet<R: Read>(
    reader: &mut R,
    max_packet_size: Option<u32>,
) -> Result<(PacketHeader, Vec<u8>), TransportError> {
    let header = PacketHeader::read_from(reader, max_packet_size)?;
    let mut cursor = PacketReader::open(&mut *reader, &header);
    // The header is untrusted: grow with the bytes that actually arrive.
    let mut payload = Vec::new();
    let mut chunk = [0u8; DECODE_CHUNK_SIZE];
    while cursor.remaining() > 0 {
        let want = usize::try_from(cursor.remaining()).map_or(chunk.len(), |r| r.min(chunk.len()));
        let n = cursor.read_bounded(&mut chunk[..want])?;
        payload.extend_from_slice(&chunk[..n]);
    }
    let (_, result) = cursor.finish();
    result?;
    Ok((header, payload))
}
