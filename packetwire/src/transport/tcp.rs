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

//! TCP transport implementation.

use crate::transport::{
    PacketTransport, RawStream, ThresholdCompression, TransportConfig, TransportError,
    TransportMetadata, TransportWrapper,
};
use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Capacity of the socket read and write buffers (16 KiB).
pub const SOCKET_BUFFER_SIZE: usize = 16 * 1024;

/// Compression threshold socket transports use once compression is enabled.
pub const DEFAULT_SOCKET_COMPRESSION_THRESHOLD: i32 = 4 * 1024;

/// TCP-based transport.
///
/// Frames packets over a `TcpStream` with buffered reads and writes and
/// Nagle's algorithm disabled, since every packet is flushed as soon as it
/// is complete. Closing the transport shuts the socket down in both
/// directions, which also releases a thread blocked reading from it.
///
/// # Examples
///
/// ```rust,no_run
/// use packetwire::transport::{SocketTransport, Transport};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = SocketTransport::connect("127.0.0.1:17100")?;
/// transport.enable_compression()?;
///
/// transport.begin_write(1)?;
/// transport.write(b"Hello, server!")?;
/// transport.end_write()?;
///
/// let seq = transport.begin_read()?;
/// let mut reply = vec![0u8; transport.remaining()? as usize];
/// transport.read(&mut reply)?;
/// transport.end_read()?;
/// println!("reply to {}: {} bytes", seq, reply.len());
///
/// transport.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SocketTransport {
    inner: PacketTransport,
    local_addr: SocketAddr,
    peer_addr: SocketAddr,
}

impl SocketTransport {
    /// Returns the configuration socket transports use by default: a
    /// compression threshold of [`DEFAULT_SOCKET_COMPRESSION_THRESHOLD`].
    pub fn default_config() -> TransportConfig {
        TransportConfig::new().with_compression_policy(Arc::new(ThresholdCompression(
            DEFAULT_SOCKET_COMPRESSION_THRESHOLD,
        )))
    }

    /// Creates a transport from an existing stream.
    ///
    /// This is typically used when accepting connections.
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        Self::from_stream_with_config(stream, Self::default_config())
    }

    /// Creates a transport from an existing stream with a custom configuration.
    #[instrument(skip(stream, config), fields(local_addr, peer_addr))]
    pub fn from_stream_with_config(
        stream: TcpStream,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let local_addr = stream.local_addr()?;
        let peer_addr = stream.peer_addr()?;
        stream.set_nodelay(true)?;

        tracing::Span::current().record("local_addr", tracing::field::display(local_addr));
        tracing::Span::current().record("peer_addr", tracing::field::display(peer_addr));

        let input = stream.try_clone()?;
        let shutdown = stream.try_clone()?;
        let raw = RawStream::new(
            BufReader::with_capacity(SOCKET_BUFFER_SIZE, input),
            BufWriter::with_capacity(SOCKET_BUFFER_SIZE, stream),
        )
        .with_shutdown(shutdown);

        let metadata = TransportMetadata::new("tcp")
            .with_local_addr(local_addr)
            .with_peer_addr(peer_addr);
        debug!(transport_id = %metadata.id, "created TCP transport from stream");

        Ok(Self {
            inner: PacketTransport::new(raw, config, metadata),
            local_addr,
            peer_addr,
        })
    }

    /// Connects to a remote TCP endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError::ConnectionFailed`] if the connection cannot
    /// be established.
    pub fn connect(addr: impl Into<String>) -> Result<Self, TransportError> {
        Self::connect_with_config(addr, Self::default_config())
    }

    /// Connects to a remote TCP endpoint with a custom configuration.
    #[instrument(skip(addr, config), fields(address))]
    pub fn connect_with_config(
        addr: impl Into<String>,
        config: TransportConfig,
    ) -> Result<Self, TransportError> {
        let address = addr.into();
        tracing::Span::current().record("address", address.as_str());
        info!("connecting to TCP endpoint");

        let stream = TcpStream::connect(&address).map_err(|source| {
            error!(%source, "failed to connect");
            TransportError::ConnectionFailed {
                address: address.clone(),
                source,
            }
        })?;

        info!("TCP connection established");
        Self::from_stream_with_config(stream, config)
    }

    /// Binds a listener for incoming connections.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError::BindFailed`] if the address cannot be bound.
    #[instrument(skip(addr), fields(address))]
    pub fn bind(addr: impl Into<String>) -> Result<TcpListener, TransportError> {
        let address = addr.into();
        tracing::Span::current().record("address", address.as_str());

        let listener = TcpListener::bind(&address).map_err(|source| {
            error!(%source, "failed to bind");
            TransportError::BindFailed {
                address: address.clone(),
                source,
            }
        })?;

        info!("TCP listener bound");
        Ok(listener)
    }

    /// Accepts an incoming connection from a listener.
    pub fn accept(listener: &TcpListener) -> Result<(Self, SocketAddr), TransportError> {
        let (stream, peer_addr) = listener.accept()?;
        info!(%peer_addr, "accepted TCP connection");
        Ok((Self::from_stream(stream)?, peer_addr))
    }

    /// Returns the local address of this transport.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the peer address of this transport.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl TransportWrapper for SocketTransport {
    type Inner = PacketTransport;

    fn inner(&self) -> &PacketTransport {
        &self.inner
    }

    fn on_close(&self) -> Result<(), TransportError> {
        info!(peer_addr = %self.peer_addr, "TCP transport closed");
        Ok(())
    }
}
