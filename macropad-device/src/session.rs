//! Device session: one live serial connection to the macropad
//!
//! ```text
//! Idle -> Connecting -> Active <-> KeyboardMode
//!              |          |            |
//!              +----------+------------+--> Closed
//! ```
//!
//! `Active <-> KeyboardMode` follows the firmware's `kbd`/`nkb` sentinels
//! only; sending the mode command does not change the mirrored state.
//!
//! A dedicated reader thread classifies each device line and dispatches it.
//! Button release callbacks run **on that thread**: a slow callback delays
//! every later button line, so callbacks must be quick or hand their work
//! off to another thread.
//!
//! Any transport failure closes the session for good. Reconnecting means
//! building a new `DeviceSession`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use macropad_transport::protocol::{self, KEYCOUNT, LIGHT_ID_MAX};
use macropad_transport::{
    parse_line, BoxedTransport, DeviceLine, ModeChange, SerialTransport, TransportError,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::chord::ChordTracker;
use crate::error::SessionError;
use crate::lights::{LightCache, LightId, Rgb};
use crate::mailbox::ValueMailbox;
use crate::program::{self, Profile};

/// Default number of open attempts
pub const DEFAULT_OPEN_RETRIES: u32 = 4;

/// Default pause between open attempts
pub const DEFAULT_RETRY_DELAY_MS: u64 = 200;

/// Default serial baud rate (must match the firmware)
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    KeyboardMode,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::KeyboardMode => "keyboard mode",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Transport parameters for opening a session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Serial port name
    pub port: String,
    pub baud_rate: u32,
    /// Total open attempts (at least one is always made)
    pub open_retries: u32,
    /// Pause between failed attempts
    pub retry_delay: Duration,
}

impl SessionConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            open_retries: DEFAULT_OPEN_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// A button release, as seen by callbacks
#[derive(Debug, Clone, Copy)]
pub struct ButtonRelease<'a> {
    /// Button that was released
    pub button: u8,
    /// Held buttons in press order, still including `button`
    pub chord: &'a [u8],
}

/// Release callback; runs on the session reader thread
pub type ButtonCallback = Arc<dyn Fn(ButtonRelease<'_>) + Send + Sync>;

/// Outcome of a light request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightUpdate {
    /// Transmitted to the device
    Sent,
    /// Cached only; the device is in keyboard mode and will get it on exit
    Deferred,
}

#[derive(Default)]
struct Callbacks {
    default: Option<ButtonCallback>,
    per_button: [Option<ButtonCallback>; KEYCOUNT],
}

impl Callbacks {
    fn for_button(&self, button: u8) -> Option<ButtonCallback> {
        self.per_button
            .get(button as usize)
            .and_then(|cb| cb.clone())
            .or_else(|| self.default.clone())
    }
}

/// State shared between the session handle and its reader thread
struct Shared {
    transport: BoxedTransport,
    state: watch::Sender<SessionState>,
    /// Lock order: `lights` before any state change
    lights: Mutex<LightCache>,
    held: Mutex<[bool; KEYCOUNT]>,
    mailbox: ValueMailbox,
    callbacks: Mutex<Callbacks>,
    stop: AtomicBool,
}

impl Shared {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: SessionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Session state {} -> {}", previous, state);
        }
    }

    /// Mirror a firmware mode change; a closed session stays closed
    fn set_mode(&self, mode: SessionState) {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Closed || *state == mode {
                return false;
            }
            debug!("Session state {} -> {}", state, mode);
            *state = mode;
            true
        });
    }

    /// Write a frame; a failure closes the session
    fn write(&self, frame: &[u8]) -> Result<(), SessionError> {
        if self.state() == SessionState::Closed {
            return Err(SessionError::Closed);
        }
        match self.transport.write_all(frame) {
            Ok(()) => Ok(()),
            Err(TransportError::Closed) => Err(SessionError::Closed),
            Err(e) => {
                warn!("Write to {} failed: {}", self.transport.port_name(), e);
                self.close();
                Err(e.into())
            }
        }
    }

    fn send_light(&self, id: LightId, rgb: Rgb) -> Result<(), SessionError> {
        let frame = protocol::light_frame(id, rgb.channels())?;
        self.write(&frame)
    }

    fn close(&self) {
        self.stop.store(true, Ordering::SeqCst);
        self.transport.close();
        self.set_state(SessionState::Closed);
    }

    fn dispatch(&self, line: DeviceLine, chord: &mut ChordTracker) -> Result<(), SessionError> {
        match line {
            DeviceLine::Button {
                index,
                pressed: true,
            } => {
                if !chord.press(index) {
                    debug!("Button {} already held", index);
                }
                *self.held.lock() = chord.held();
            }
            DeviceLine::Button {
                index,
                pressed: false,
            } => {
                let callback = self.callbacks.lock().for_button(index);
                chord.release(index, |held| {
                    debug!("Button {} released, chord {:?}", index, held);
                    if let Some(cb) = callback {
                        cb(ButtonRelease {
                            button: index,
                            chord: held,
                        });
                    }
                });
                *self.held.lock() = chord.held();
            }
            DeviceLine::Mode(ModeChange::Entered) => {
                let _lights = self.lights.lock();
                info!("Device entered keyboard mode");
                self.set_mode(SessionState::KeyboardMode);
            }
            DeviceLine::Mode(ModeChange::Left) => {
                let lights = self.lights.lock();
                info!("Device left keyboard mode, restoring {} lights", lights.len());
                for (id, rgb) in lights.iter() {
                    self.send_light(id, rgb)?;
                }
                self.set_mode(SessionState::Active);
            }
            DeviceLine::Value(value) => {
                debug!("Device value: {:?}", value);
                self.mailbox.put(value);
            }
        }
        Ok(())
    }
}

fn run_read_loop(shared: Arc<Shared>) {
    let port = shared.transport.port_name().to_string();
    debug!("Session reader for {} started", port);
    let mut chord = ChordTracker::new();

    while !shared.stop.load(Ordering::SeqCst) {
        let line = match shared.transport.read_line() {
            Ok(line) => line,
            Err(e) if e.is_closed() || shared.stop.load(Ordering::SeqCst) => break,
            Err(e) => {
                warn!("Lost connection to {}: {}", port, e);
                break;
            }
        };

        match parse_line(&line) {
            Ok(event) => {
                if let Err(e) = shared.dispatch(event, &mut chord) {
                    warn!("Session on {} failed: {}", port, e);
                    break;
                }
            }
            Err(e) => debug!("Discarding device line: {}", e),
        }
    }

    shared.close();
    info!("Session on {} closed", port);
}

/// Live connection to the macropad
pub struct DeviceSession {
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
}

impl DeviceSession {
    /// Open the configured serial port and start the reader thread
    pub fn open(
        config: &SessionConfig,
        on_release: Option<ButtonCallback>,
    ) -> Result<Self, SessionError> {
        let port = config.port.clone();
        let baud_rate = config.baud_rate;
        Self::open_with(config, on_release, move || {
            SerialTransport::open(&port, baud_rate).map(|t| Arc::new(t) as BoxedTransport)
        })
    }

    /// Open through a custom transport factory, retrying per `config`
    pub fn open_with<F>(
        config: &SessionConfig,
        on_release: Option<ButtonCallback>,
        mut opener: F,
    ) -> Result<Self, SessionError>
    where
        F: FnMut() -> Result<BoxedTransport, TransportError>,
    {
        let (state, _) = watch::channel(SessionState::Idle);
        state.send_replace(SessionState::Connecting);

        let attempts = config.open_retries.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match opener() {
                Ok(transport) => {
                    info!("Connected to {} (attempt {})", transport.port_name(), attempt);
                    return Ok(Self::spawn(transport, state, on_release));
                }
                Err(e) => {
                    warn!(
                        "Open attempt {}/{} on {} failed: {}",
                        attempt, attempts, config.port, e
                    );
                    last_error = Some(e);
                    if attempt < attempts {
                        std::thread::sleep(config.retry_delay);
                    }
                }
            }
        }

        state.send_replace(SessionState::Closed);
        Err(SessionError::ConnectionFailed {
            port: config.port.clone(),
            attempts,
            source: last_error.unwrap_or_else(|| TransportError::PortNotFound(config.port.clone())),
        })
    }

    /// Start a session over an already open transport
    pub fn start(transport: BoxedTransport, on_release: Option<ButtonCallback>) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        Self::spawn(transport, state, on_release)
    }

    fn spawn(
        transport: BoxedTransport,
        state: watch::Sender<SessionState>,
        on_release: Option<ButtonCallback>,
    ) -> Self {
        state.send_replace(SessionState::Active);
        let shared = Arc::new(Shared {
            transport,
            state,
            lights: Mutex::new(LightCache::new()),
            held: Mutex::new([false; KEYCOUNT]),
            mailbox: ValueMailbox::new(),
            callbacks: Mutex::new(Callbacks {
                default: on_release,
                ..Default::default()
            }),
            stop: AtomicBool::new(false),
        });

        let reader_shared = Arc::clone(&shared);
        let reader = std::thread::Builder::new()
            .name("macropad-session-reader".into())
            .spawn(move || run_read_loop(reader_shared))
            .expect("Failed to spawn session reader thread");

        Self {
            shared,
            reader: Some(reader),
        }
    }

    /// Current mirrored state
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Watch state transitions (e.g. to notice `Closed`)
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    pub fn port_name(&self) -> &str {
        self.shared.transport.port_name()
    }

    /// Replace the release callback used by buttons without their own
    pub fn set_default_callback(&self, callback: ButtonCallback) {
        self.shared.callbacks.lock().default = Some(callback);
    }

    /// Install a release callback for one button
    pub fn set_button_callback(&self, button: u8, callback: ButtonCallback) {
        if let Some(slot) = self
            .shared
            .callbacks
            .lock()
            .per_button
            .get_mut(button as usize)
        {
            *slot = Some(callback);
        }
    }

    /// Set one indicator light
    ///
    /// The cache is always updated. The frame is only sent outside keyboard
    /// mode; inside it the request is deferred until the firmware hands the
    /// keys back.
    pub fn set_light(&self, id: LightId, rgb: Rgb) -> Result<LightUpdate, SessionError> {
        if id > LIGHT_ID_MAX {
            return Err(SessionError::InvalidLight(id));
        }
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut lights = self.shared.lights.lock();
        lights.set(id, rgb);
        if self.shared.state() == SessionState::KeyboardMode {
            info!("Light {} cached, not sent in keyboard mode", id);
            return Ok(LightUpdate::Deferred);
        }
        self.shared.send_light(id, rgb)?;
        Ok(LightUpdate::Sent)
    }

    /// Ask the firmware to enter or leave keyboard mode
    pub fn set_keyboard_mode(&self, on: bool) -> Result<(), SessionError> {
        self.shared.write(&protocol::keyboard_mode_frame(on))
    }

    /// Upload a macro program; there is no acknowledgement
    pub fn upload_program(&self, profile: &Profile) -> Result<(), SessionError> {
        let encoded = program::encode(profile);
        debug!("Uploading program {}", program::to_hex(&encoded));
        self.shared.write(&protocol::program_frame(&encoded))
    }

    /// Wait up to `timeout` for the next out-of-band value
    pub fn read_value(&self, timeout: Duration) -> Option<String> {
        self.shared.mailbox.take(timeout)
    }

    /// Held flag per button
    pub fn buttons(&self) -> [bool; KEYCOUNT] {
        *self.shared.held.lock()
    }

    /// Cached light colours in id order
    pub fn lights(&self) -> Vec<(LightId, Rgb)> {
        self.shared.lights.lock().iter().collect()
    }

    /// Stop the reader and release the transport
    ///
    /// Safe to call from a release callback; the reader exits after the
    /// callback returns.
    pub fn stop(&self) {
        if !self.shared.stop.swap(true, Ordering::SeqCst) {
            debug!("Stopping session on {}", self.port_name());
        }
        self.shared.close();
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.stop();
        if let Some(reader) = self.reader.take() {
            if reader.thread().id() != std::thread::current().id() {
                let _ = reader.join();
            }
        }
    }
}
