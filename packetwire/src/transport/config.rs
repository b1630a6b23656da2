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

//! Transport configuration.
//!
//! [`TransportConfig`] carries the tunables of a
//! [`PacketTransport`](crate::transport::PacketTransport): buffer sizing,
//! deflate level, the packet size limit and the [`CompressionPolicy`]
//! consulted by `enable_compression`.

use flate2::Compression;
use std::sync::Arc;

/// Initial capacity of the write and compression buffers (128 KiB).
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 128 * 1024;

/// Default deflate level (balanced speed/ratio).
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Decides the compression threshold a transport uses once compression is
/// enabled.
///
/// Payloads of at least `threshold` bytes are compressed. A threshold of zero
/// or less means the transport does not support compression, and
/// `enable_compression` will report `false`.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::CompressionPolicy;
///
/// struct LargeOnly;
///
/// impl CompressionPolicy for LargeOnly {
///     fn compression_threshold(&self) -> i32 {
///         64 * 1024
///     }
/// }
///
/// assert_eq!(LargeOnly.compression_threshold(), 65536);
/// ```
pub trait CompressionPolicy: Send + Sync {
    /// Returns the compression threshold in bytes.
    fn compression_threshold(&self) -> i32;
}

/// Policy for transports that never compress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCompression;

impl CompressionPolicy for NoCompression {
    fn compression_threshold(&self) -> i32 {
        -1
    }
}

/// Policy that compresses payloads of at least the given size.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdCompression(pub i32);

impl CompressionPolicy for ThresholdCompression {
    fn compression_threshold(&self) -> i32 {
        self.0
    }
}

/// Configuration for a [`PacketTransport`](crate::transport::PacketTransport).
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::{ThresholdCompression, TransportConfig};
/// use std::sync::Arc;
///
/// let config = TransportConfig::new()
///     .with_compression_policy(Arc::new(ThresholdCompression(4096)))
///     .with_compression_level(9)
///     .with_max_packet_size(16 * 1024 * 1024);
///
/// assert_eq!(config.compression_level(), 9);
/// assert_eq!(config.max_packet_size(), Some(16 * 1024 * 1024));
/// assert_eq!(config.compression_policy().compression_threshold(), 4096);
/// ```
#[derive(Clone)]
pub struct TransportConfig {
    /// Starting capacity of the reusable buffers
    initial_buffer_size: usize,

    /// Deflate level (0-9)
    compression_level: u32,

    /// Largest payload accepted from the peer, if limited
    max_packet_size: Option<u32>,

    /// Consulted by `enable_compression`
    compression_policy: Arc<dyn CompressionPolicy>,
}

impl TransportConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_packet_size: None,
            compression_policy: Arc::new(NoCompression),
        }
    }

    /// Sets the starting capacity of the write and compression buffers.
    pub fn with_initial_buffer_size(mut self, size: usize) -> Self {
        self.initial_buffer_size = size;
        self
    }

    /// Sets the deflate level, clamped to `0..=9`.
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    /// Rejects incoming packets whose declared length exceeds `size`.
    pub fn with_max_packet_size(mut self, size: u32) -> Self {
        self.max_packet_size = Some(size);
        self
    }

    /// Sets the policy consulted by `enable_compression`.
    pub fn with_compression_policy(mut self, policy: Arc<dyn CompressionPolicy>) -> Self {
        self.compression_policy = policy;
        self
    }

    /// Returns the starting buffer capacity.
    pub fn initial_buffer_size(&self) -> usize {
        self.initial_buffer_size
    }

    /// Returns the deflate level.
    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }

    /// Returns the deflate level as a `flate2` setting.
    pub fn compression(&self) -> Compression {
        Compression::new(self.compression_level)
    }

    /// Returns the incoming packet size limit, if any.
    pub fn max_packet_size(&self) -> Option<u32> {
        self.max_packet_size
    }

    /// Returns the compression policy.
    pub fn compression_policy(&self) -> &Arc<dyn CompressionPolicy> {
        &self.compression_policy
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("initial_buffer_size", &self.initial_buffer_size)
            .field("compression_level", &self.compression_level)
            .field("max_packet_size", &self.max_packet_size)
            .field(
                "compression_threshold",
                &self.compression_policy.compression_threshold(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.initial_buffer_size(), DEFAULT_INITIAL_BUFFER_SIZE);
        assert_eq!(config.compression_level(), DEFAULT_COMPRESSION_LEVEL);
        assert!(config.max_packet_size().is_none());
        assert_eq!(config.compression_policy().compression_threshold(), -1);
    }

    #[test]
    fn test_compression_level_clamping() {
        let config = TransportConfig::new().with_compression_level(100);
        assert_eq!(config.compression_level(), 9);
        assert_eq!(config.compression(), Compression::best());
    }

    #[test]
    fn test_builder() {
        let config = TransportConfig::new()
            .with_initial_buffer_size(1024)
            .with_max_packet_size(2048)
            .with_compression_policy(Arc::new(ThresholdCompression(512)));
        assert_eq!(config.initial_buffer_size(), 1024);
        assert_eq!(config.max_packet_size(), Some(2048));
        assert_eq!(config.compression_policy().compression_threshold(), 512);
    }

    #[test]
    fn test_debug_shows_threshold() {
        let config =
            TransportConfig::new().with_compression_policy(Arc::new(ThresholdCompression(4096)));
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("TransportConfig"));
        assert!(debug_str.contains("4096"));
    }
}
