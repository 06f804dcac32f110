//! Transport error types

use std::io;

use thiserror::Error;

/// Errors that can occur during transport operations
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("Failed to open {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    #[error("Device disconnected")]
    Disconnected,

    /// The transport was closed locally (stop requested)
    #[error("Transport closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Port enumeration failed: {0}")]
    Enumeration(String),
}

impl TransportError {
    /// Whether this error means the local side asked for the close
    pub fn is_closed(&self) -> bool {
        matches!(self, TransportError::Closed)
    }
}

impl From<io::Error> for TransportError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionAborted => TransportError::Disconnected,
            _ => TransportError::Io(e.to_string()),
        }
    }
}

impl From<serialport::Error> for TransportError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::NoDevice => TransportError::Disconnected,
            serialport::ErrorKind::InvalidInput => TransportError::InvalidParameter(e.to_string()),
            serialport::ErrorKind::Io(kind) => io::Error::new(kind, e.description).into(),
            serialport::ErrorKind::Unknown => TransportError::Io(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_pipe_is_disconnect() {
        let err: TransportError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, TransportError::Disconnected));
    }

    #[test]
    fn test_other_io_kept_as_message() {
        let err: TransportError = io::Error::new(io::ErrorKind::Other, "weird").into();
        assert!(matches!(err, TransportError::Io(ref m) if m == "weird"));
        assert!(!err.is_closed());
    }
}
