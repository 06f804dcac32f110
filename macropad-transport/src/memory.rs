//! In-memory transport
//!
//! Scripted stand-in for a serial port: lines pushed with [`MemoryTransport::push_line`]
//! are returned by `read_line` in order, and everything the host writes is
//! captured for inspection. Used by the session and orchestrator tests.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::error::TransportError;
use crate::Transport;

#[derive(Default)]
struct Inner {
    lines: VecDeque<String>,
    written: Vec<Vec<u8>>,
    closed: bool,
    /// Device side hung up: pending reads fail with `Disconnected`
    hung_up: bool,
    fail_writes: bool,
}

/// Scripted in-memory transport
pub struct MemoryTransport {
    name: String,
    inner: Mutex<Inner>,
    readable: Condvar,
}

impl MemoryTransport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inner: Mutex::new(Inner::default()),
            readable: Condvar::new(),
        }
    }

    /// Queue a line as if the device printed it (newline appended)
    pub fn push_line(&self, line: &str) {
        let mut inner = self.inner.lock();
        inner.lines.push_back(format!("{line}\r\n"));
        self.readable.notify_all();
    }

    /// Simulate the device vanishing: reads fail once queued lines drain
    pub fn hang_up(&self) {
        let mut inner = self.inner.lock();
        inner.hung_up = true;
        self.readable.notify_all();
    }

    /// Make every subsequent write fail with `Disconnected`
    pub fn fail_writes(&self) {
        self.inner.lock().fail_writes = true;
    }

    /// Frames written by the host so far, one entry per `write_all`
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.inner.lock().written.clone()
    }

    /// Drain and return the captured frames
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.inner.lock().written)
    }

    /// Whether every queued line has been consumed
    pub fn is_drained(&self) -> bool {
        self.inner.lock().lines.is_empty()
    }
}

impl Transport for MemoryTransport {
    fn write_all(&self, data: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        if inner.fail_writes {
            return Err(TransportError::Disconnected);
        }
        inner.written.push(data.to_vec());
        Ok(())
    }

    fn read_line(&self) -> Result<String, TransportError> {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return Err(TransportError::Closed);
            }
            if let Some(line) = inner.lines.pop_front() {
                return Ok(line);
            }
            if inner.hung_up {
                return Err(TransportError::Disconnected);
            }
            self.readable.wait(&mut inner);
        }
    }

    fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        self.readable.notify_all();
    }

    fn is_open(&self) -> bool {
        !self.inner.lock().closed
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_lines_in_order() {
        let t = MemoryTransport::new("mem0");
        t.push_line("0-1");
        t.push_line("0-0");
        assert_eq!(t.read_line().unwrap(), "0-1\r\n");
        assert_eq!(t.read_line().unwrap(), "0-0\r\n");
        assert!(t.is_drained());
    }

    #[test]
    fn test_close_unblocks_reader() {
        let t = std::sync::Arc::new(MemoryTransport::new("mem0"));
        let reader = {
            let t = t.clone();
            std::thread::spawn(move || t.read_line())
        };
        std::thread::sleep(Duration::from_millis(20));
        t.close();
        let result = reader.join().unwrap();
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[test]
    fn test_hang_up_after_drain() {
        let t = MemoryTransport::new("mem0");
        t.push_line("nkb");
        t.hang_up();
        assert!(t.read_line().is_ok());
        assert!(matches!(t.read_line(), Err(TransportError::Disconnected)));
    }

    #[test]
    fn test_captures_writes() {
        let t = MemoryTransport::new("mem0");
        t.write_all(b"k").unwrap();
        t.write_all(&[b'0', 1, 2, 3]).unwrap();
        assert_eq!(t.take_written(), vec![vec![b'k'], vec![b'0', 1, 2, 3]]);
        assert!(t.written().is_empty());
    }
}
