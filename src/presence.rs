//! Presence monitor
//!
//! Watches the host's serial port list for the macropad coming and going,
//! independently of any serial traffic:
//!
//! ```text
//!  Disconnected --(matching port created)--> Connected { port }
//!  Connected { port } --(port deleted)--> Disconnected
//! ```
//!
//! Every transition is reported as a [`PresenceEvent`] on an unbounded
//! channel. The watch wait is bounded by `watch_timeout`; a timeout is the
//! idle case and is when the stop flag gets checked, so [`PresenceHandle::stop`]
//! takes effect within one timeout.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use macropad_transport::{PortEvent, PortWatcher, TransportError};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Default identifier prefix of the macropad (SparkFun Pro Micro)
pub const DEFAULT_DEVICE_ID: &str = "USB\\VID_1B4F&PID_9204";

/// Default bound on a single watch wait
pub const DEFAULT_WATCH_TIMEOUT_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("Device enumeration failed: {0}")]
    Enumeration(#[from] TransportError),
}

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Platform identifier prefix a port must have to be claimed
    pub device_id: String,
    pub watch_timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            watch_timeout: Duration::from_millis(DEFAULT_WATCH_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceState {
    Disconnected,
    Connected { port: String },
}

impl fmt::Display for PresenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceState::Disconnected => f.write_str("disconnected"),
            PresenceState::Connected { port } => write!(f, "connected on {port}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    Connected { port: String },
    Disconnected { port: String },
    /// The monitor hit an enumeration error and stopped; nothing will
    /// reconnect until it is restarted
    MonitorFailed { reason: String },
}

/// State shared between the monitor thread and its handles
struct Shared {
    state: Mutex<PresenceState>,
    stop: AtomicBool,
}

pub struct PresenceMonitor {
    watcher: Box<dyn PortWatcher>,
    config: PresenceConfig,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<PresenceEvent>,
}

impl PresenceMonitor {
    pub fn new(
        watcher: Box<dyn PortWatcher>,
        config: PresenceConfig,
        events: mpsc::UnboundedSender<PresenceEvent>,
    ) -> Self {
        Self {
            watcher,
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(PresenceState::Disconnected),
                stop: AtomicBool::new(false),
            }),
            events,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.shared.state.lock().clone()
    }

    /// Control handle; valid before and after [`spawn`](Self::spawn)
    pub fn control(&self) -> PresenceControl {
        PresenceControl {
            shared: Arc::clone(&self.shared),
        }
    }

    fn emit(&self, event: PresenceEvent) {
        info!("Presence: {:?}", event);
        if self.events.send(event).is_err() {
            debug!("Presence event dropped, no receiver");
        }
    }

    /// One enumeration pass; claims the first matching port already present
    pub fn startup(&mut self) -> Result<(), PresenceError> {
        let ports = self.watcher.enumerate()?;
        for port in &ports {
            debug!("Found port {} ({})", port.port_name, port.device_id);
        }

        let Some(found) = ports.into_iter().find(|p| p.matches(&self.config.device_id)) else {
            return Ok(());
        };
        {
            let mut state = self.shared.state.lock();
            if *state != PresenceState::Disconnected {
                return Ok(());
            }
            *state = PresenceState::Connected {
                port: found.port_name.clone(),
            };
        }
        self.emit(PresenceEvent::Connected {
            port: found.port_name,
        });
        Ok(())
    }

    /// Wait for one watcher event and apply it
    ///
    /// A timeout is not an error. Events for a port other than the bound one
    /// are ignored; a matching port appearing while connected elsewhere
    /// rebinds to the newer port.
    pub fn poll_once(&mut self) -> Result<(), PresenceError> {
        let Some(event) = self.watcher.next_event(self.config.watch_timeout)? else {
            return Ok(());
        };

        let mut emitted = Vec::new();
        {
            let mut state = self.shared.state.lock();
            match (&*state, event) {
                (PresenceState::Disconnected, PortEvent::Created(info))
                    if info.matches(&self.config.device_id) =>
                {
                    *state = PresenceState::Connected {
                        port: info.port_name.clone(),
                    };
                    emitted.push(PresenceEvent::Connected {
                        port: info.port_name,
                    });
                }
                (PresenceState::Connected { port }, PortEvent::Deleted(info))
                    if info.port_name == *port =>
                {
                    emitted.push(PresenceEvent::Disconnected {
                        port: info.port_name,
                    });
                    *state = PresenceState::Disconnected;
                }
                (PresenceState::Connected { port }, PortEvent::Created(info))
                    if info.port_name != *port && info.matches(&self.config.device_id) =>
                {
                    emitted.push(PresenceEvent::Disconnected { port: port.clone() });
                    emitted.push(PresenceEvent::Connected {
                        port: info.port_name.clone(),
                    });
                    *state = PresenceState::Connected {
                        port: info.port_name,
                    };
                }
                (_, event) => debug!("Ignoring port event {:?}", event),
            }
        }

        for event in emitted {
            self.emit(event);
        }
        Ok(())
    }

    /// Run until stopped or enumeration fails
    pub fn run(&mut self) -> Result<(), PresenceError> {
        self.startup()?;
        while !self.shared.stop.load(Ordering::SeqCst) {
            self.poll_once()?;
        }
        debug!("Presence monitor stopped");
        Ok(())
    }

    /// Run on a dedicated thread
    ///
    /// A fatal error is logged and reported as [`PresenceEvent::MonitorFailed`].
    pub fn spawn(mut self) -> PresenceHandle {
        let control = self.control();
        let thread = std::thread::Builder::new()
            .name("macropad-presence".into())
            .spawn(move || {
                if let Err(e) = self.run() {
                    error!("Presence monitor failed: {}", e);
                    self.emit(PresenceEvent::MonitorFailed {
                        reason: e.to_string(),
                    });
                }
            })
            .expect("Failed to spawn presence monitor thread");

        PresenceHandle {
            control,
            thread: Some(thread),
        }
    }
}

/// Cloneable access to a monitor's state and overrides
#[derive(Clone)]
pub struct PresenceControl {
    shared: Arc<Shared>,
}

impl PresenceControl {
    pub fn state(&self) -> PresenceState {
        self.shared.state.lock().clone()
    }

    /// Treat `port` as connected without having seen it appear
    ///
    /// Used after connecting to a manually configured port; the monitor then
    /// waits for that port's deletion.
    pub fn assume_connected(&self, port: impl Into<String>) {
        let port = port.into();
        info!("Presence: assuming connected on {}", port);
        *self.shared.state.lock() = PresenceState::Connected { port };
    }

    /// Ask the monitor loop to exit after the current wait
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
    }
}

/// Owns the monitor thread
pub struct PresenceHandle {
    control: PresenceControl,
    thread: Option<JoinHandle<()>>,
}

impl PresenceHandle {
    pub fn state(&self) -> PresenceState {
        self.control.state()
    }

    /// Stop the monitor and wait for its thread
    pub fn stop(&mut self) {
        self.control.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PresenceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macropad_transport::PortInfo;
    use std::collections::VecDeque;

    /// Watcher that replays a fixed script; `None` entries are timeouts
    struct ScriptedWatcher {
        present: Vec<PortInfo>,
        script: VecDeque<Option<PortEvent>>,
    }

    impl PortWatcher for ScriptedWatcher {
        fn enumerate(&mut self) -> Result<Vec<PortInfo>, TransportError> {
            Ok(self.present.clone())
        }

        fn next_event(&mut self, _timeout: Duration) -> Result<Option<PortEvent>, TransportError> {
            Ok(self.script.pop_front().flatten())
        }
    }

    fn pad(port: &str) -> PortInfo {
        PortInfo::new(port, format!("{DEFAULT_DEVICE_ID}\\5&1234"))
    }

    fn other(port: &str) -> PortInfo {
        PortInfo::new(port, "USB\\VID_2341&PID_0043")
    }

    fn monitor(
        present: Vec<PortInfo>,
        script: Vec<Option<PortEvent>>,
    ) -> (PresenceMonitor, mpsc::UnboundedReceiver<PresenceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = ScriptedWatcher {
            present,
            script: script.into(),
        };
        (
            PresenceMonitor::new(Box::new(watcher), PresenceConfig::default(), tx),
            rx,
        )
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PresenceEvent>) -> Vec<PresenceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_startup_claims_present_device() {
        let (mut m, mut rx) = monitor(vec![other("COM3"), pad("COM18")], vec![]);
        m.startup().unwrap();
        assert_eq!(
            m.state(),
            PresenceState::Connected {
                port: "COM18".into()
            }
        );
        assert_eq!(
            drain(&mut rx),
            vec![PresenceEvent::Connected {
                port: "COM18".into()
            }]
        );
    }

    #[test]
    fn test_startup_without_device() {
        let (mut m, mut rx) = monitor(vec![other("COM3")], vec![]);
        m.startup().unwrap();
        assert_eq!(m.state(), PresenceState::Disconnected);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_timeouts_are_not_errors() {
        let (mut m, mut rx) = monitor(vec![], vec![None, None]);
        m.poll_once().unwrap();
        m.poll_once().unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_plug_then_unplug_from_disconnected() {
        let (mut m, mut rx) = monitor(
            vec![],
            vec![
                Some(PortEvent::Created(pad("COM18"))),
                Some(PortEvent::Deleted(pad("COM18"))),
            ],
        );
        assert_eq!(m.state(), PresenceState::Disconnected);

        m.poll_once().unwrap();
        assert_eq!(
            m.state(),
            PresenceState::Connected {
                port: "COM18".into()
            }
        );
        m.poll_once().unwrap();
        assert_eq!(m.state(), PresenceState::Disconnected);

        assert_eq!(
            drain(&mut rx),
            vec![
                PresenceEvent::Connected {
                    port: "COM18".into()
                },
                PresenceEvent::Disconnected {
                    port: "COM18".into()
                },
            ]
        );
    }

    #[test]
    fn test_foreign_port_is_ignored() {
        let (mut m, mut rx) = monitor(
            vec![],
            vec![
                Some(PortEvent::Created(other("COM3"))),
                Some(PortEvent::Deleted(other("COM3"))),
            ],
        );
        m.poll_once().unwrap();
        assert_eq!(m.state(), PresenceState::Disconnected);
        m.poll_once().unwrap();
        assert_eq!(m.state(), PresenceState::Disconnected);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_assume_connected_then_deletion() {
        let (mut m, mut rx) = monitor(
            vec![],
            vec![
                Some(PortEvent::Deleted(other("COM3"))),
                Some(PortEvent::Deleted(pad("COM18"))),
            ],
        );
        m.control().assume_connected("COM18");
        m.poll_once().unwrap();
        assert!(drain(&mut rx).is_empty());
        m.poll_once().unwrap();
        assert_eq!(m.state(), PresenceState::Disconnected);
        assert_eq!(
            drain(&mut rx),
            vec![PresenceEvent::Disconnected {
                port: "COM18".into()
            }]
        );
    }

    #[test]
    fn test_newer_device_rebinds() {
        let (mut m, mut rx) = monitor(
            vec![pad("COM18")],
            vec![
                Some(PortEvent::Created(pad("COM19"))),
                Some(PortEvent::Deleted(pad("COM18"))),
            ],
        );
        m.startup().unwrap();
        m.poll_once().unwrap();
        m.poll_once().unwrap();
        assert_eq!(
            m.state(),
            PresenceState::Connected {
                port: "COM19".into()
            }
        );
        assert_eq!(
            drain(&mut rx),
            vec![
                PresenceEvent::Connected {
                    port: "COM18".into()
                },
                PresenceEvent::Disconnected {
                    port: "COM18".into()
                },
                PresenceEvent::Connected {
                    port: "COM19".into()
                },
            ]
        );
    }

    struct FailingWatcher;

    impl PortWatcher for FailingWatcher {
        fn enumerate(&mut self) -> Result<Vec<PortInfo>, TransportError> {
            Ok(vec![])
        }

        fn next_event(&mut self, _timeout: Duration) -> Result<Option<PortEvent>, TransportError> {
            Err(TransportError::Enumeration("access denied".into()))
        }
    }

    #[test]
    fn test_enumeration_failure_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let m = PresenceMonitor::new(Box::new(FailingWatcher), PresenceConfig::default(), tx);
        let mut handle = m.spawn();
        match rx.blocking_recv() {
            Some(PresenceEvent::MonitorFailed { reason }) => {
                assert!(reason.contains("access denied"))
            }
            other => panic!("expected MonitorFailed, got {other:?}"),
        }
        handle.stop();
    }
}
