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

//! Transport layer error types.
//!
//! Every operation on a [`Transport`](crate::transport::Transport) reports
//! failure through [`TransportError`]. The variants fall into three groups:
//!
//! - **Misuse**: [`Reentrancy`](TransportError::Reentrancy),
//!   [`ProtocolState`](TransportError::ProtocolState) and
//!   [`Overread`](TransportError::Overread) indicate a caller that broke the
//!   transaction discipline. The transport itself is still usable.
//! - **Wire failures**: [`Codec`](TransportError::Codec) and
//!   [`Stream`](TransportError::Stream) mean the byte stream is no longer
//!   aligned to a packet boundary. The caller should close the transport.
//! - **Lifecycle**: [`Closed`](TransportError::Closed),
//!   [`ConnectionFailed`](TransportError::ConnectionFailed),
//!   [`BindFailed`](TransportError::BindFailed) and
//!   [`StartupFailed`](TransportError::StartupFailed).
//!
//! No variant is retried internally. By the time an error reaches the caller
//! the lock of the failing transaction has already been released.

use std::io;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use packetwire::transport::TransportError;
/// use std::io;
///
/// let error = TransportError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
/// assert!(error.should_close_transport());
///
/// let error = TransportError::Overread { requested: 10, remaining: 4 };
/// assert!(!error.should_close_transport());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// The calling thread already holds the lock of this transaction kind.
    ///
    /// Raised by `begin_read` / `begin_write` when the same thread begins a
    /// second transaction of the same kind without finishing the first.
    #[error("{operation} is not reentrant")]
    Reentrancy {
        /// The operation that was re-entered
        operation: &'static str,
    },

    /// An operation was called outside of its transaction bracket.
    #[error("{operation} requires an open {transaction} transaction on the calling thread")]
    ProtocolState {
        /// The operation that was called
        operation: &'static str,
        /// The transaction kind that must be open ("read" or "write")
        transaction: &'static str,
    },

    /// A read requested more bytes than remain in the current packet.
    ///
    /// The cursor is not advanced.
    #[error("requested {requested} bytes but only {remaining} remain in the current packet")]
    Overread {
        /// Number of bytes requested
        requested: usize,
        /// Number of bytes left in the packet
        remaining: u64,
    },

    /// A packet header was malformed, or (de)compression failed.
    #[error("codec error: {reason}")]
    Codec {
        /// Description of what was malformed
        reason: String,
        /// The underlying I/O error, if any
        #[source]
        source: Option<io::Error>,
    },

    /// The underlying byte stream failed.
    ///
    /// This includes a premature end-of-stream while a header or payload was
    /// still expected.
    #[error("stream error: {source}")]
    Stream {
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The transport has been closed.
    #[error("transport is closed")]
    Closed,

    /// Failed to establish a connection to the remote endpoint.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// The address that failed to connect
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to bind to a local address.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// The address that failed to bind
        address: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A spawned peer did not complete its startup handshake.
    #[error("peer process failed to start: {reason}")]
    StartupFailed {
        /// Description of the handshake failure
        reason: String,
        /// The underlying I/O error, if any
        #[source]
        source: Option<io::Error>,
    },
}

impl TransportError {
    /// Creates a codec error without an underlying cause.
    pub fn codec(reason: impl Into<String>) -> Self {
        TransportError::Codec {
            reason: reason.into(),
            source: None,
        }
    }

    /// Creates a codec error caused by an I/O error from the (de)compressor.
    pub fn codec_io(reason: impl Into<String>, source: io::Error) -> Self {
        TransportError::Codec {
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Returns `true` if the transport can still be used after this error.
    ///
    /// Misuse errors leave the wire untouched, so the next transaction will
    /// work as expected. Everything else either broke packet alignment or
    /// happened on a transport that is gone.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use packetwire::transport::TransportError;
    ///
    /// assert!(TransportError::Reentrancy { operation: "begin_read" }.is_recoverable());
    /// assert!(!TransportError::Closed.is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::Reentrancy { .. }
            | TransportError::ProtocolState { .. }
            | TransportError::Overread { .. } => true,

            TransportError::ConnectionFailed { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
            ),

            TransportError::Codec { .. }
            | TransportError::Stream { .. }
            | TransportError::Closed
            | TransportError::BindFailed { .. }
            | TransportError::StartupFailed { .. } => false,
        }
    }

    /// Returns `true` if this error means the transport should be closed and
    /// rebuilt.
    ///
    /// The wire is never realigned automatically, so any failure in the
    /// middle of a packet leaves the stream unusable.
    pub fn should_close_transport(&self) -> bool {
        match self {
            TransportError::Codec { .. }
            | TransportError::Stream { .. }
            | TransportError::Closed => true,

            TransportError::Reentrancy { .. }
            | TransportError::ProtocolState { .. }
            | TransportError::Overread { .. }
            | TransportError::ConnectionFailed { .. }
            | TransportError::BindFailed { .. }
            | TransportError::StartupFailed { .. } => false,
        }
    }

    /// Create a stream error for testing.
    #[cfg(test)]
    pub fn stream(kind: io::ErrorKind) -> Self {
        TransportError::Stream {
            source: io::Error::new(kind, "test stream error"),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        TransportError::Stream { source: error }
    }
}

impl From<TransportError> for io::Error {
    fn from(error: TransportError) -> Self {
        let kind = match error {
            TransportError::Stream { source } => return source,
            TransportError::Reentrancy { .. }
            | TransportError::ProtocolState { .. }
            | TransportError::Overread { .. } => io::ErrorKind::InvalidInput,
            TransportError::Codec { .. } => io::ErrorKind::InvalidData,
            TransportError::Closed => io::ErrorKind::NotConnected,
            TransportError::ConnectionFailed { .. } => io::ErrorKind::ConnectionRefused,
            TransportError::BindFailed { .. } => io::ErrorKind::AddrInUse,
            TransportError::StartupFailed { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misuse_errors_are_recoverable() {
        let errors = [
            TransportError::Reentrancy {
                operation: "begin_read",
            },
            TransportError::ProtocolState {
                operation: "read",
                transaction: "read",
            },
            TransportError::Overread {
                requested: 8,
                remaining: 2,
            },
        ];
        for error in errors {
            assert!(error.is_recoverable(), "{error}");
            assert!(!error.should_close_transport(), "{error}");
        }
    }

    #[test]
    fn test_wire_errors_close_transport() {
        let error = TransportError::stream(io::ErrorKind::UnexpectedEof);
        assert!(!error.is_recoverable());
        assert!(error.should_close_transport());

        let error = TransportError::codec("negative packet length -1");
        assert!(!error.is_recoverable());
        assert!(error.should_close_transport());
    }

    #[test]
    fn test_closed_is_terminal() {
        let error = TransportError::Closed;
        assert!(!error.is_recoverable());
        assert!(error.should_close_transport());
        assert_eq!(error.to_string(), "transport is closed");
    }

    #[test]
    fn test_connection_refused_is_recoverable() {
        let error = TransportError::ConnectionFailed {
            address: "127.0.0.1:1".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(error.is_recoverable());
        assert!(!error.should_close_transport());
    }

    #[test]
    fn test_io_error_maps_to_stream() {
        let error: TransportError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(error, TransportError::Stream { .. }));
    }

    #[test]
    fn test_into_io_error() {
        let error: io::Error = TransportError::stream(io::ErrorKind::BrokenPipe).into();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);

        let error: io::Error = TransportError::Overread {
            requested: 2,
            remaining: 1,
        }
        .into();
        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);

        let error: io::Error = TransportError::Closed.into();
        assert_eq!(error.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_display_messages() {
        let error = TransportError::Overread {
            requested: 10,
            remaining: 3,
        };
        assert_eq!(
            error.to_string(),
            "requested 10 bytes but only 3 remain in the current packet"
        );

        let error = TransportError::ProtocolState {
            operation: "end_write",
            transaction: "write",
        };
        assert!(error.to_string().contains("end_write"));
        assert!(error.to_string().contains("write transaction"));
    }

    #[test]
    fn test_codec_io_keeps_source() {
        use std::error::Error;
        let error = TransportError::codec_io(
            "corrupt deflate stream",
            io::Error::new(io::ErrorKind::InvalidData, "bad"),
        );
        assert!(error.source().is_some());
    }
}
