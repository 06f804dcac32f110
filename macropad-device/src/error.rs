//! Device session error types

use macropad_transport::TransportError;
use thiserror::Error;

/// Errors from device session operations
#[derive(Error, Debug)]
pub enum SessionError {
    /// Every open attempt failed
    #[error("Connection to {port} failed after {attempts} attempts: {source}")]
    ConnectionFailed {
        port: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The session has been stopped or lost its transport
    #[error("Session is closed")]
    Closed,

    /// Light id does not fit the light frame
    #[error("Invalid light id {0}")]
    InvalidLight(u8),
}
