//! Session orchestrator
//!
//! Glue between the presence monitor, the device session and the media
//! player: a connect event opens a session, a disconnect event drops it, and
//! every button release is looked up in the chord map and queued to the
//! media worker. The only state kept here is the current session (if any)
//! and the selected profile.

use std::sync::Arc;

use macropad_device::{
    ButtonCallback, ButtonRelease, DeviceSession, LightId, Rgb, SessionConfig, SessionError,
    SessionState, KEYCOUNT,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chords::ChordMap;
use crate::player::{status_lights, MediaController, MediaSender, MediaWorker, PlayerStatus};
use crate::presence::{PresenceControl, PresenceEvent};
use crate::profile::ProfileLibrary;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("No device session")]
    NoSession,

    #[error("No default port configured")]
    NoDefaultPort,

    #[error("Unknown profile {0:?}")]
    UnknownProfile(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Opens a device session; replaced in tests
pub type Connector =
    Box<dyn FnMut(&SessionConfig, ButtonCallback) -> Result<DeviceSession, SessionError> + Send>;

fn serial_connector() -> Connector {
    Box::new(|config, callback| DeviceSession::open(config, Some(callback)))
}

/// Build the release callback: chord lookup, then hand off to the media worker
///
/// Runs on the session reader thread, so it only does a map lookup and a
/// channel send.
pub fn chord_callback(chords: Arc<ChordMap>, media: MediaSender) -> ButtonCallback {
    Arc::new(move |release: ButtonRelease<'_>| match chords.lookup(release.chord) {
        Some(action) => {
            debug!("Chord {:?} -> {}", release.chord, action);
            media.send(action);
        }
        None => debug!("Chord {:?} unbound", release.chord),
    })
}

pub struct Orchestrator {
    /// Session parameters; `port` is filled in per connection
    session_template: SessionConfig,
    default_port: Option<String>,
    connector: Connector,
    session: Option<DeviceSession>,
    chords: Arc<ChordMap>,
    media: MediaWorker,
    library: ProfileLibrary,
    active_profile: Option<String>,
    presence: Option<PresenceControl>,
}

impl Orchestrator {
    pub fn new(
        session_template: SessionConfig,
        default_port: Option<String>,
        chords: ChordMap,
        player: Box<dyn MediaController>,
        library: ProfileLibrary,
    ) -> Self {
        Self {
            session_template,
            default_port,
            connector: serial_connector(),
            session: None,
            chords: Arc::new(chords),
            media: MediaWorker::spawn(player),
            library,
            active_profile: None,
            presence: None,
        }
    }

    /// Replace how sessions are opened
    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    /// Presence monitor to notify on manual connects
    pub fn attach_presence(&mut self, presence: PresenceControl) {
        self.presence = Some(presence);
    }

    /// React to a presence monitor event
    pub fn handle_presence(&mut self, event: PresenceEvent) {
        match event {
            PresenceEvent::Connected { port } => {
                if let Some(session) = &self.session {
                    if session.port_name() == port && !session.is_closed() {
                        debug!("Already connected to {}", port);
                        return;
                    }
                }
                if let Err(e) = self.connect(&port) {
                    warn!("Could not open {}: {}", port, e);
                }
            }
            PresenceEvent::Disconnected { port } => {
                let bound = self
                    .session
                    .as_ref()
                    .is_some_and(|s| s.port_name() == port);
                if bound {
                    info!("Lost connection to {}", port);
                    self.disconnect();
                } else {
                    debug!("Ignoring disconnect of unbound port {}", port);
                }
            }
            PresenceEvent::MonitorFailed { reason } => {
                warn!("Presence monitor failed ({}); use connect to reconnect", reason);
            }
        }
    }

    /// Open a session on `port`, replacing any current one
    pub fn connect(&mut self, port: &str) -> Result<(), OrchestratorError> {
        self.disconnect();

        let mut config = self.session_template.clone();
        config.port = port.to_string();
        let callback = chord_callback(Arc::clone(&self.chords), self.media.sender());
        let session = (self.connector)(&config, callback)?;
        info!("Session open on {}", session.port_name());
        self.session = Some(session);
        Ok(())
    }

    /// Connect to the configured default port and tell the presence monitor
    pub fn connect_default(&mut self) -> Result<String, OrchestratorError> {
        let port = self
            .default_port
            .clone()
            .ok_or(OrchestratorError::NoDefaultPort)?;
        self.connect(&port)?;
        if let Some(presence) = &self.presence {
            presence.assume_connected(port.clone());
        }
        Ok(port)
    }

    /// Stop and drop the current session, if any
    pub fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            debug!("Stopping session on {}", session.port_name());
            session.stop();
        }
    }

    pub fn session(&self) -> Option<&DeviceSession> {
        self.session.as_ref()
    }

    /// Current session, if it is still usable
    fn live_session(&self) -> Result<&DeviceSession, OrchestratorError> {
        match &self.session {
            Some(session) if !session.is_closed() => Ok(session),
            _ => Err(OrchestratorError::NoSession),
        }
    }

    pub fn session_state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(SessionState::Idle)
    }

    pub fn buttons(&self) -> Option<[bool; KEYCOUNT]> {
        self.session.as_ref().map(|s| s.buttons())
    }

    pub fn lights(&self) -> Option<Vec<(LightId, Rgb)>> {
        self.session.as_ref().map(|s| s.lights())
    }

    pub fn set_keyboard_mode(&self, on: bool) -> Result<(), OrchestratorError> {
        Ok(self.live_session()?.set_keyboard_mode(on)?)
    }

    /// Select a profile and upload it to the connected device
    ///
    /// The selection sticks even without a device.
    pub fn load_profile(&mut self, name: &str) -> Result<(), OrchestratorError> {
        let profile = self
            .library
            .get(name)
            .ok_or_else(|| OrchestratorError::UnknownProfile(name.to_string()))?;
        match self.live_session() {
            Ok(session) => {
                session.upload_program(profile)?;
                info!("Uploaded profile {}", name);
            }
            Err(_) => info!("Profile {} selected, no device connected", name),
        }
        self.active_profile = Some(name.to_string());
        Ok(())
    }

    pub fn active_profile(&self) -> Option<&str> {
        self.active_profile.as_deref()
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.library.names()
    }

    /// Whether the player will stop after the current track
    pub fn stop_after_current(&self) -> bool {
        self.media.stop_after_current()
    }

    /// Reflect player state on the indicator lights
    pub fn show_player_status(&self, status: &PlayerStatus) -> Result<(), OrchestratorError> {
        let session = self.live_session()?;
        for (id, rgb) in status_lights(status) {
            session.set_light(id, rgb)?;
        }
        Ok(())
    }

    /// Drop the session and stop the media worker
    pub fn shutdown(&mut self) {
        self.disconnect();
        self.media.shutdown();
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.disconnect();
    }
}
