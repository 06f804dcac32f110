//! Serial port discovery and hot-plug watching
//!
//! There is no portable creation/deletion notification for serial ports, so
//! [`SerialPortWatcher`] polls the OS port list and diffs successive
//! snapshots. Each diff yields [`PortEvent`]s that are handed out one at a
//! time through [`PortWatcher::next_event`].

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use serialport::{SerialPortInfo, SerialPortType};
use tracing::{debug, trace};

use crate::error::TransportError;

/// Default interval between port list scans
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;

/// A serial port as seen by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// OS port name (`COM18`, `/dev/ttyACM0`)
    pub port_name: String,
    /// Platform identifier used for device matching, e.g. `USB\VID_1B4F&PID_9204\...`
    pub device_id: String,
}

impl PortInfo {
    pub fn new(port_name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            device_id: device_id.into(),
        }
    }

    /// Case-sensitive prefix test against the configured device identifier
    pub fn matches(&self, prefix: &str) -> bool {
        self.device_id.starts_with(prefix)
    }
}

/// Port arrival or removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    Created(PortInfo),
    Deleted(PortInfo),
}

/// Source of port enumeration and hot-plug events
pub trait PortWatcher: Send {
    /// List the ports present right now
    fn enumerate(&mut self) -> Result<Vec<PortInfo>, TransportError>;

    /// Wait up to `timeout` for the next creation or deletion
    ///
    /// `Ok(None)` means the wait timed out; that is the normal idle result.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<PortEvent>, TransportError>;
}

/// Build the platform identifier string for a port
pub fn platform_device_id(info: &SerialPortInfo) -> String {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            let mut id = format!("USB\\VID_{:04X}&PID_{:04X}", usb.vid, usb.pid);
            if let Some(serial) = &usb.serial_number {
                id.push('\\');
                id.push_str(serial);
            }
            id
        }
        SerialPortType::PciPort => format!("PCI\\{}", info.port_name),
        SerialPortType::BluetoothPort => format!("BT\\{}", info.port_name),
        SerialPortType::Unknown => format!("UNKNOWN\\{}", info.port_name),
    }
}

/// List the serial ports currently present
pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports = serialport::available_ports()
        .map_err(|e| TransportError::Enumeration(e.to_string()))?;
    Ok(ports
        .iter()
        .map(|p| PortInfo::new(p.port_name.clone(), platform_device_id(p)))
        .collect())
}

/// Compute creation and deletion events between two snapshots
pub fn diff_snapshots(
    old: &BTreeMap<String, PortInfo>,
    new: &BTreeMap<String, PortInfo>,
) -> Vec<PortEvent> {
    let mut events = Vec::new();
    for (name, info) in old {
        if !new.contains_key(name) {
            events.push(PortEvent::Deleted(info.clone()));
        }
    }
    for (name, info) in new {
        if !old.contains_key(name) {
            events.push(PortEvent::Created(info.clone()));
        }
    }
    events
}

fn snapshot(ports: Vec<PortInfo>) -> BTreeMap<String, PortInfo> {
    ports.into_iter().map(|p| (p.port_name.clone(), p)).collect()
}

/// Polling watcher over the OS serial port list
pub struct SerialPortWatcher {
    poll_interval: Duration,
    known: BTreeMap<String, PortInfo>,
    pending: VecDeque<PortEvent>,
}

impl SerialPortWatcher {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            known: BTreeMap::new(),
            pending: VecDeque::new(),
        }
    }

    fn rescan(&mut self) -> Result<(), TransportError> {
        let current = snapshot(list_ports()?);
        let events = diff_snapshots(&self.known, &current);
        for event in &events {
            debug!("Port event: {:?}", event);
        }
        self.pending.extend(events);
        self.known = current;
        Ok(())
    }
}

impl Default for SerialPortWatcher {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl PortWatcher for SerialPortWatcher {
    fn enumerate(&mut self) -> Result<Vec<PortInfo>, TransportError> {
        let ports = list_ports()?;
        self.known = snapshot(ports.clone());
        Ok(ports)
    }

    fn next_event(&mut self, timeout: Duration) -> Result<Option<PortEvent>, TransportError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            let now = Instant::now();
            if now >= deadline {
                trace!("Port watch timed out");
                return Ok(None);
            }
            std::thread::sleep(self.poll_interval.min(deadline - now));
            self.rescan()?;
        }
    }
}
