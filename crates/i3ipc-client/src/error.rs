//! Error types for i3 IPC operations

use std::path::PathBuf;
use thiserror::Error;

/// Broad category of an [`IpcError`]
///
/// Callers use this to decide what to do next: a connection error may be
/// worth a reconnect, a protocol error means the stream position can no longer
/// be trusted, a decode error means the peer speaks a different schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket unavailable, closed, or failing on read/write
    Connection,
    /// Malformed or unexpected frame
    Protocol,
    /// Reply payload does not have the expected shape
    Decode,
    /// The window manager rejected a command
    Command,
}

/// Errors that can occur when talking to the i3 (or sway) IPC socket
#[derive(Debug, Error)]
pub enum IpcError {
    /// Neither I3SOCK nor SWAYSOCK is set and the window manager could not be asked
    #[error("I3SOCK/SWAYSOCK not set and `i3 --get-socketpath` failed - is i3 running?")]
    SocketNotSet,

    /// The socket path does not exist
    #[error("i3 socket not found at {path}")]
    SocketNotFound { path: PathBuf },

    /// Failed to connect to the socket
    #[error("Failed to connect to i3 socket at {path}: {source}")]
    ConnectionFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a request frame
    #[error("Failed to send request to i3: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Failed to read a reply frame
    #[error("Failed to receive reply from i3: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The peer closed the connection before sending a reply
    #[error("Connection to i3 closed unexpectedly")]
    ConnectionClosed,

    /// The session was already closed
    #[error("Session is closed")]
    NotConnected,

    /// The frame does not start with the `i3-ipc` marker
    #[error("Invalid frame magic: {found:?}")]
    BadMagic { found: [u8; 6] },

    /// The stream ended in the middle of a frame
    #[error("Truncated frame: expected {expected} bytes, got {received}")]
    TruncatedFrame { expected: usize, received: usize },

    /// The payload length is above the configured cap, or does not fit the
    /// header's u32 length field
    #[error("Payload size {length} exceeds maximum {max}")]
    PayloadTooLarge { length: u64, max: u32 },

    /// The reply carries a different message type than the request
    #[error("Unexpected reply type {actual:#x} to request type {expected}")]
    UnexpectedReplyType { expected: u32, actual: u32 },

    /// A previous exchange was abandoned half way; the stream position is unknown
    #[error("Session is desynchronized after an incomplete exchange, reconnect required")]
    Desynchronized,

    /// The reply payload is not valid JSON
    #[error("Failed to parse reply: {0}")]
    MalformedJson(#[source] serde_json::Error),

    /// The reply payload is JSON of the wrong overall shape
    #[error("Unexpected reply shape: expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    /// A field had an unexpected JSON type (strict decoding only)
    #[error("Type mismatch at {path}: {message}")]
    TypeMismatch { path: String, message: String },

    /// i3 reported that a command failed
    #[error("Command failed: {message}")]
    CommandFailed { message: String },
}

impl IpcError {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            IpcError::SocketNotSet
            | IpcError::SocketNotFound { .. }
            | IpcError::ConnectionFailed { .. }
            | IpcError::SendFailed(_)
            | IpcError::ReceiveFailed(_)
            | IpcError::ConnectionClosed
            | IpcError::NotConnected => ErrorKind::Connection,
            IpcError::BadMagic { .. }
            | IpcError::TruncatedFrame { .. }
            | IpcError::PayloadTooLarge { .. }
            | IpcError::UnexpectedReplyType { .. }
            | IpcError::Desynchronized => ErrorKind::Protocol,
            IpcError::MalformedJson(_)
            | IpcError::UnexpectedShape { .. }
            | IpcError::TypeMismatch { .. } => ErrorKind::Decode,
            IpcError::CommandFailed { .. } => ErrorKind::Command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(IpcError::ConnectionClosed.kind(), ErrorKind::Connection);
        assert_eq!(IpcError::NotConnected.kind(), ErrorKind::Connection);
        assert_eq!(
            IpcError::BadMagic { found: *b"xxxxxx" }.kind(),
            ErrorKind::Protocol
        );
        assert_eq!(IpcError::Desynchronized.kind(), ErrorKind::Protocol);
        assert_eq!(
            IpcError::UnexpectedShape {
                expected: "array",
                found: "object"
            }
            .kind(),
            ErrorKind::Decode
        );
        assert_eq!(
            IpcError::CommandFailed {
                message: "nope".to_string()
            }
            .kind(),
            ErrorKind::Command
        );
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let err = IpcError::UnexpectedReplyType {
            expected: 4,
            actual: 0x8000_0000,
        };
        let message = err.to_string();
        assert!(message.contains("0x80000000"), "got: {}", message);

        let err = IpcError::TruncatedFrame {
            expected: 14,
            received: 3,
        };
        assert_eq!(err.to_string(), "Truncated frame: expected 14 bytes, got 3");
    }
}
