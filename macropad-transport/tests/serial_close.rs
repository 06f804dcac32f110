//! Closing a serial transport gives the port back to the system.
//!
//! Uses pseudo-terminal pairs in place of the macropad and counts this
//! process's open descriptors. Kept as the only test in this binary so no
//! parallel test opens files while counting.

#![cfg(target_os = "linux")]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use macropad_transport::{SerialTransport, Transport, TransportError};
use serialport::{SerialPort, TTYPort};

fn open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd").unwrap().count()
}

#[test]
fn close_releases_port_handles() {
    // ── Idle transport ──
    let (_master, slave) = TTYPort::pair().unwrap();
    let path = slave.name().unwrap();

    let before = open_fds();
    let transport = SerialTransport::open(&path, 115_200).unwrap();
    assert!(open_fds() > before);

    transport.close();
    assert!(!transport.is_open());
    assert_eq!(open_fds(), before);
    assert!(matches!(transport.write_all(b"k"), Err(TransportError::Closed)));
    assert!(matches!(transport.read_line(), Err(TransportError::Closed)));
    drop(transport);

    // ── Close while a read is blocked ──
    let (_master, slave) = TTYPort::pair().unwrap();
    let path = slave.name().unwrap();

    let before = open_fds();
    let transport = Arc::new(SerialTransport::open(&path, 115_200).unwrap());
    let reader = {
        let transport = Arc::clone(&transport);
        thread::spawn(move || transport.read_line())
    };
    thread::sleep(Duration::from_millis(50));

    transport.close();
    let result = reader.join().unwrap();
    assert!(matches!(result, Err(TransportError::Closed)));
    assert_eq!(open_fds(), before);
}
