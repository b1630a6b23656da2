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

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique transport IDs.
static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transport.
///
/// Transport IDs tag every log event a transport emits, so concurrent
/// connections can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    /// Creates a transport ID from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide unique ID.
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transport({})", self.0)
    }
}

/// Metadata associated with a transport.
#[derive(Debug, Clone)]
pub struct TransportMetadata {
    /// Unique identifier for this transport
    pub id: TransportId,

    /// Local address of the connection, if available
    pub local_addr: Option<SocketAddr>,

    /// Remote peer address, if available
    pub peer_addr: Option<SocketAddr>,

    /// Transport type (e.g., "tcp", "memory", "process")
    pub transport_type: String,

    /// When the transport was created
    pub created_at: std::time::Instant,
}

impl TransportMetadata {
    /// Creates metadata with a freshly allocated ID.
    pub fn new(transport_type: impl Into<String>) -> Self {
        Self::with_id(TransportId::next(), transport_type)
    }

    /// Creates metadata for a given ID.
    pub fn with_id(id: TransportId, transport_type: impl Into<String>) -> Self {
        Self {
            id,
            local_addr: None,
            peer_addr: None,
            transport_type: transport_type.into(),
            created_at: std::time::Instant::now(),
        }
    }

    /// Sets the local address.
    pub fn with_local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }

    /// Sets the peer address.
    pub fn with_peer_addr(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Returns the age of this transport.
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_id_creation() {
        let id = TransportId::new(42);
        assert_eq!(id.as_u64(), 42);
    }

    #[test]
    fn test_transport_id_display() {
        let id = TransportId::new(123);
        assert_eq!(format!("{}", id), "Transport(123)");
    }

    #[test]
    fn test_next_ids_are_unique() {
        let a = TransportId::next();
        let b = TransportId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_transport_metadata_with_addresses() {
        let local = "127.0.0.1:8080".parse().unwrap();
        let peer = "127.0.0.1:9090".parse().unwrap();

        let metadata = TransportMetadata::with_id(TransportId::new(1), "tcp")
            .with_local_addr(local)
            .with_peer_addr(peer);

        assert_eq!(metadata.id, TransportId::new(1));
        assert_eq!(metadata.transport_type, "tcp");
        assert_eq!(metadata.local_addr, Some(local));
        assert_eq!(metadata.peer_addr, Some(peer));
    }

    #[test]
    fn test_transport_metadata_age() {
        let metadata = TransportMetadata::new("memory");
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(metadata.age().as_millis() >= 10);
    }
}
