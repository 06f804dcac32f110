//! Configuration file
//!
//! A single TOML file, by default `<config dir>/macropad/config.toml`. Every
//! key is optional:
//!
//! ```toml
//! device_id = "USB\\VID_1B4F&PID_9204"
//! default_port = "COM18"
//! baud_rate = 115200
//! open_retries = 4
//! retry_delay_ms = 200
//! watch_timeout_ms = 2000
//! poll_interval_ms = 250
//! profiles_dir = "/home/me/.config/macropad/profiles"
//! log_level = "info"
//!
//! [player]
//! exe = "C:\\Program Files (x86)\\foobar2000\\foobar2000.exe"
//! now_playing_file = "M:\\now_playing.txt"
//!
//! [[chords]]
//! keys = [3, 4]
//! action = "next"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use macropad_device::SessionConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chords::{ChordBinding, ChordMap};
use crate::player::PlayerConfig;
use crate::presence::{PresenceConfig, DEFAULT_DEVICE_ID, DEFAULT_WATCH_TIMEOUT_MS};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Platform identifier prefix of the device
    pub device_id: String,
    /// Port for manual `connect`
    pub default_port: Option<String>,
    pub baud_rate: u32,
    /// Total open attempts per connection
    pub open_retries: u32,
    pub retry_delay_ms: u64,
    /// Bound on one presence watch wait
    pub watch_timeout_ms: u64,
    /// Serial port list scan interval
    pub poll_interval_ms: u64,
    /// Profile directory; defaults to `profiles` next to the config file
    pub profiles_dir: Option<PathBuf>,
    pub log_level: String,
    pub player: PlayerConfig,
    /// Chord map entries layered over the built-in layout
    pub chords: Vec<ChordBinding>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            default_port: None,
            baud_rate: macropad_device::session::DEFAULT_BAUD_RATE,
            open_retries: macropad_device::session::DEFAULT_OPEN_RETRIES,
            retry_delay_ms: macropad_device::session::DEFAULT_RETRY_DELAY_MS,
            watch_timeout_ms: DEFAULT_WATCH_TIMEOUT_MS,
            poll_interval_ms: macropad_transport::discovery::DEFAULT_POLL_INTERVAL_MS,
            profiles_dir: None,
            log_level: "info".to_string(),
            player: PlayerConfig::default(),
            chords: Vec::new(),
        }
    }
}

impl Config {
    /// Directory holding the config file and default profile directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("macropad")
    }

    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.profiles_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("profiles"))
    }

    /// Session parameters for `port`
    pub fn session_config(&self, port: &str) -> SessionConfig {
        SessionConfig {
            port: port.to_string(),
            baud_rate: self.baud_rate,
            open_retries: self.open_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn presence_config(&self) -> PresenceConfig {
        PresenceConfig {
            device_id: self.device_id.clone(),
            watch_timeout: Duration::from_millis(self.watch_timeout_ms),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn chord_map(&self) -> ChordMap {
        ChordMap::with_overrides(&self.chords)
    }
}
