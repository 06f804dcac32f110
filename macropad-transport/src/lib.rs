//! Transport layer for the five-key macropad
//!
//! This crate covers everything below the device session:
//!
//! - the serial wire protocol (constants and host to device frames)
//! - classification of device lines into button, mode and value events
//! - the [`Transport`] trait with serial and in-memory backends
//! - serial port enumeration and polling hot-plug detection

pub mod discovery;
pub mod error;
pub mod event_parser;
pub mod memory;
pub mod protocol;

mod serial;

pub use discovery::{
    list_ports, platform_device_id, PortEvent, PortInfo, PortWatcher, SerialPortWatcher,
};
pub use error::TransportError;
pub use event_parser::{parse_line, DeviceLine, ModeChange, ParseError};
pub use memory::MemoryTransport;
pub use protocol::{KEYCOUNT, MACRO_END, MAX_MACRO_SIZE, PROG_SIZE};
pub use serial::SerialTransport;

use std::sync::Arc;

/// The core transport trait - all backends implement this
///
/// Implementations are shared between the session read loop (which blocks in
/// `read_line`) and caller threads (which `write_all`), so every method takes
/// `&self`.
pub trait Transport: Send + Sync {
    /// Write one complete host to device frame
    fn write_all(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Block until a full line arrives from the device
    ///
    /// There is no timeout: a silent device simply keeps the caller waiting.
    /// Returns [`TransportError::Closed`] once [`Transport::close`] was called.
    fn read_line(&self) -> Result<String, TransportError>;

    /// Close the transport, unblocking any pending `read_line`
    fn close(&self);

    /// Whether `close` has not been called yet
    fn is_open(&self) -> bool;

    /// Port or device name, for logging
    fn port_name(&self) -> &str;
}

/// Type alias for a shared transport
pub type BoxedTransport = Arc<dyn Transport>;
