//! Serial transport for the USB CDC link

use std::io::{BufRead, BufReader, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serialport::SerialPort;
use tracing::debug;

use crate::error::TransportError;
use crate::Transport;

/// Poll interval of the underlying port read.
///
/// `read_line` itself never times out; the port timeout only bounds how long
/// a local `close()` takes to unblock a pending read.
const READ_POLL_MS: u64 = 100;

/// Serial transport backed by the `serialport` crate
///
/// Reads and writes use separate handles (the writer is a `try_clone` of the
/// reader) so the read loop can block on a line while other threads send
/// commands. Both handles are dropped on `close`, releasing the port; a read
/// in progress drops its handle at the next poll.
pub struct SerialTransport {
    port_name: String,
    reader: Mutex<Option<BufReader<Box<dyn SerialPort>>>>,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    closed: AtomicBool,
}

impl SerialTransport {
    /// Open a serial port at the given baud rate
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(READ_POLL_MS))
            .open()
            .map_err(|e| TransportError::OpenFailed {
                port: port_name.to_string(),
                reason: e.to_string(),
            })?;
        let writer = port.try_clone()?;

        debug!("Opened serial port {} at {} baud", port_name, baud_rate);

        Ok(Self {
            port_name: port_name.to_string(),
            reader: Mutex::new(Some(BufReader::new(port))),
            writer: Mutex::new(Some(writer)),
            closed: AtomicBool::new(false),
        })
    }
}

impl Transport for SerialTransport {
    fn write_all(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    fn read_line(&self) -> Result<String, TransportError> {
        let mut guard = self.reader.lock();
        let mut buf = Vec::new();
        loop {
            if self.closed.load(Ordering::SeqCst) {
                *guard = None;
                return Err(TransportError::Closed);
            }
            let Some(reader) = guard.as_mut() else {
                return Err(TransportError::Closed);
            };
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(_) if buf.ends_with(b"\n") => {
                    return Ok(String::from_utf8_lossy(&buf).into_owned());
                }
                // Partial line; keep what we have and wait for the rest
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closing serial port {}", self.port_name);
        }
        self.writer.lock().take();
        // A blocked reader holds the lock and drops its handle itself
        if let Some(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    fn port_name(&self) -> &str {
        &self.port_name
    }
}
