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

//! Byte-level checks of what a transport puts on the wire and how it
//! reacts to malformed input.

use flate2::read::DeflateDecoder;
use packetwire::codec::HEADER_SIZE;
use packetwire::transport::{
    PacketTransport, RawStream, ThresholdCompression, Transport, TransportConfig, TransportError,
    TransportMetadata,
};
use parking_lot::Mutex;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn writer(threshold: Option<i32>) -> (PacketTransport, SharedBuffer) {
    let mut config = TransportConfig::new();
    if let Some(threshold) = threshold {
        config = config.with_compression_policy(Arc::new(ThresholdCompression(threshold)));
    }
    let sink = SharedBuffer::default();
    let transport = PacketTransport::new(
        RawStream::new(io::empty(), sink.clone()),
        config,
        TransportMetadata::new("wire-test"),
    );
    if threshold.is_some() {
        transport.enable_compression().unwrap();
    }
    (transport, sink)
}

fn reader(wire: Vec<u8>) -> PacketTransport {
    PacketTransport::from_stream(RawStream::new(Cursor::new(wire), io::sink()))
}

fn field(wire: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes(wire[offset..offset + 4].try_into().unwrap())
}

fn send(transport: &PacketTransport, sequence: i32, payload: &[u8]) {
    transport.begin_write(sequence).unwrap();
    transport.write(payload).unwrap();
    transport.end_write().unwrap();
}

#[test]
fn test_empty_transaction_writes_no_bytes() {
    let (transport, sink) = writer(None);
    transport.begin_write(9).unwrap();
    transport.end_write().unwrap();
    assert!(sink.0.lock().is_empty());
}

#[test]
fn test_exact_header_bytes() {
    let (transport, sink) = writer(None);
    send(&transport, 0x0102_0304, b"hello");

    let wire = sink.0.lock().clone();
    assert_eq!(
        wire,
        [
            0x01, 0x02, 0x03, 0x04, // sequence
            0x00, 0x00, 0x00, 0x05, // packet length
            0x00, 0x00, 0x00, 0x00, // uncompressed length
            b'h', b'e', b'l', b'l', b'o',
        ]
    );
}

#[test]
fn test_negative_sequence_is_twos_complement() {
    let (transport, sink) = writer(None);
    send(&transport, -1, b"x");
    let wire = sink.0.lock().clone();
    assert_eq!(&wire[..4], &[0xff, 0xff, 0xff, 0xff]);
}

#[test]
fn test_uncompressed_length_follows_threshold() {
    let (transport, sink) = writer(Some(100));
    send(&transport, 1, &[b'a'; 99]);
    send(&transport, 2, &[b'a'; 100]);

    let wire = sink.0.lock().clone();
    assert_eq!(field(&wire, 4), 99);
    assert_eq!(field(&wire, 8), 0);

    let second = &wire[HEADER_SIZE + 99..];
    assert_eq!(field(second, 0), 2);
    assert_eq!(field(second, 8), 100);
    assert_eq!(second.len(), HEADER_SIZE + field(second, 4) as usize);
}

#[test]
fn test_compressed_payload_is_raw_deflate() {
    let payload: Vec<u8> = b"the quick brown fox ".repeat(500);
    let (transport, sink) = writer(Some(64));
    send(&transport, 5, &payload);

    let wire = sink.0.lock().clone();
    let packet_length = field(&wire, 4) as usize;
    assert_eq!(field(&wire, 8) as usize, payload.len());
    assert!(packet_length < payload.len());
    assert_eq!(wire.len(), HEADER_SIZE + packet_length);

    let mut inflated = Vec::new();
    DeflateDecoder::new(&wire[HEADER_SIZE..])
        .read_to_end(&mut inflated)
        .unwrap();
    assert_eq!(inflated, payload);
}

#[test]
fn test_reads_frames_from_another_encoder() {
    let payload = vec![7u8; 3000];
    let mut compressed = Vec::new();
    {
        let mut encoder =
            flate2::write::DeflateEncoder::new(&mut compressed, flate2::Compression::best());
        encoder.write_all(&payload).unwrap();
        encoder.finish().unwrap();
    }

    let mut wire = Vec::new();
    wire.extend_from_slice(&42i32.to_be_bytes());
    wire.extend_from_slice(&(compressed.len() as i32).to_be_bytes());
    wire.extend_from_slice(&(payload.len() as i32).to_be_bytes());
    wire.extend_from_slice(&compressed);

    let transport = reader(wire);
    assert_eq!(transport.begin_read().unwrap(), 42);
    assert_eq!(transport.remaining().unwrap(), payload.len() as u64);
    let mut decoded = Vec::new();
    transport.input_stream().read_to_end(&mut decoded).unwrap();
    transport.end_read().unwrap();
    assert_eq!(decoded, payload);
}

#[test]
fn test_zero_length_packet_is_readable() {
    let transport = reader(vec![0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0]);
    assert_eq!(transport.begin_read().unwrap(), 3);
    assert_eq!(transport.remaining().unwrap(), 0);
    transport.end_read().unwrap();
}

#[test]
fn test_negative_lengths_are_rejected() {
    let mut wire = Vec::new();
    wire.extend_from_slice(&1i32.to_be_bytes());
    wire.extend_from_slice(&4i32.to_be_bytes());
    wire.extend_from_slice(&(-1i32).to_be_bytes());
    wire.extend_from_slice(b"abcd");

    let error = reader(wire).begin_read().unwrap_err();
    assert!(matches!(error, TransportError::Codec { .. }));
    assert!(error.should_close_transport());
}

#[test]
fn test_corrupt_deflate_payload_fails_transaction() {
    let mut wire = Vec::new();
    wire.extend_from_slice(&1i32.to_be_bytes());
    wire.extend_from_slice(&8i32.to_be_bytes());
    wire.extend_from_slice(&64i32.to_be_bytes());
    wire.extend_from_slice(&[0xff; 8]);

    let transport = reader(wire);
    transport.begin_read().unwrap();
    let mut buf = [0u8; 64];
    let error = transport.read(&mut buf).unwrap_err();
    assert!(matches!(
        error,
        TransportError::Codec { .. } | TransportError::Stream { .. }
    ));
    assert!(error.should_close_transport());
}

#[test]
fn test_short_deflate_stream_is_codec_error() {
    // Claims 100 inflated bytes but only inflates to 10.
    let mut compressed = Vec::new();
    {
        let mut encoder =
            flate2::write::DeflateEncoder::new(&mut compressed, flate2::Compression::default());
        encoder.write_all(&[1u8; 10]).unwrap();
        encoder.finish().unwrap();
    }
    let mut wire = Vec::new();
    wire.extend_from_slice(&1i32.to_be_bytes());
    wire.extend_from_slice(&(compressed.len() as i32).to_be_bytes());
    wire.extend_from_slice(&100i32.to_be_bytes());
    wire.extend_from_slice(&compressed);

    let transport = reader(wire);
    transport.begin_read().unwrap();
    let mut buf = [0u8; 100];
    let mut filled = 0;
    let error = loop {
        match transport.read(&mut buf[filled..]) {
            Ok(n) => filled += n,
            Err(error) => break error,
        }
    };
    assert_eq!(filled, 10);
    assert!(matches!(error, TransportError::Codec { .. }));
}

#[test]
fn test_inflating_past_declared_length_fails_end_read() {
    let mut compressed = Vec::new();
    {
        let mut encoder =
            flate2::write::DeflateEncoder::new(&mut compressed, flate2::Compression::default());
        encoder.write_all(&[3u8; 20]).unwrap();
        encoder.finish().unwrap();
    }
    let mut wire = Vec::new();
    wire.extend_from_slice(&1i32.to_be_bytes());
    wire.extend_from_slice(&(compressed.len() as i32).to_be_bytes());
    wire.extend_from_slice(&10i32.to_be_bytes());
    wire.extend_from_slice(&compressed);

    let transport = reader(wire);
    transport.begin_read().unwrap();
    let mut buf = [0u8; 10];
    let mut filled = 0;
    while filled < buf.len() {
        filled += transport.read(&mut buf[filled..]).unwrap();
    }
    assert_eq!(buf, [3u8; 10]);

    let error = transport.end_read().unwrap_err();
    assert!(matches!(error, TransportError::Codec { .. }));
    assert!(error.should_close_transport());
}
