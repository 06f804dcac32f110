// Five-key macropad host - Shared Library
// Profiles, presence monitoring, chord actions and session orchestration

pub mod chords;
pub mod config;
pub mod orchestrator;
pub mod player;
pub mod presence;
pub mod profile;
pub mod shell;

pub use chords::{ChordAction, ChordBinding, ChordMap};
pub use config::{Config, ConfigError};
pub use orchestrator::{chord_callback, Connector, Orchestrator, OrchestratorError};
pub use player::{
    status_lights, CommandPlayer, MediaController, MediaSender, MediaWorker, PlayerConfig,
    PlayerError, PlayerStatus,
};
pub use presence::{
    PresenceConfig, PresenceControl, PresenceError, PresenceEvent, PresenceHandle,
    PresenceMonitor, PresenceState,
};
pub use profile::{compile, LoadError, ProfileDocument, ProfileLibrary, ValidationError};
pub use shell::ShellCommand;
