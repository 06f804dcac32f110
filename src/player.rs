//! Media player control
//!
//! Chord actions end up here. The player is driven by launching its
//! executable with one command-line switch per action, the way foobar2000
//! style players accept remote commands. Launching a process is slow compared
//! to button traffic, so actions are queued to a [`MediaWorker`] thread and
//! the session reader never waits on the player.
//!
//! Player state (playing, progress, rating) is read from a "now playing"
//! text file the player keeps up to date, one field per line.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::thread::JoinHandle;

use macropad_device::{LightId, Rgb};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chords::ChordAction;

/// Errors from the media player collaborator
#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("No player executable configured")]
    NotConfigured,

    #[error("Failed to launch {exe}: {reason}")]
    Launch { exe: String, reason: String },

    #[error("{exe} exited with {status}")]
    Failed { exe: String, status: String },

    #[error("Failed to read now-playing file {path}: {reason}")]
    NowPlaying { path: String, reason: String },
}

/// `[player]` section of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Player executable; actions fail with `NotConfigured` without it
    pub exe: Option<PathBuf>,
    /// Per-action argument overrides, keyed by action name
    /// (`play-pause = ["/play"]`). An empty list disables the action.
    /// `{order}` in a `toggle-shuffle` argument is replaced by the new order.
    pub args: BTreeMap<String, Vec<String>>,
    /// Text file the player rewrites on every state change
    pub now_playing_file: Option<PathBuf>,
    /// Meaning of each line of the now-playing file
    pub now_playing_format: Vec<String>,
}

fn default_now_playing_format() -> Vec<String> {
    [
        "playing", "artist", "title", "album", "rating", "percent", "art", "greater4",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            exe: None,
            args: BTreeMap::new(),
            now_playing_file: None,
            now_playing_format: default_now_playing_format(),
        }
    }
}

/// Anything that can carry out a chord action
pub trait MediaController: Send {
    fn perform(&mut self, action: ChordAction) -> Result<(), PlayerError>;

    /// Whether playback is set to stop after the current track
    fn stop_after_current(&self) -> bool {
        false
    }
}

/// Playback order, toggled by [`ChordAction::ToggleShuffle`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayOrder {
    #[default]
    Default,
    Shuffle,
}

impl PlayOrder {
    /// Name as the player's menu spells it
    pub fn name(&self) -> &'static str {
        match self {
            PlayOrder::Default => "Default",
            PlayOrder::Shuffle => "Shuffle (tracks)",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            PlayOrder::Default => PlayOrder::Shuffle,
            PlayOrder::Shuffle => PlayOrder::Default,
        }
    }
}

/// Drives the player by launching its executable
///
/// Stop-after-current and play order cannot be queried from the player, so
/// they are tracked locally from the commands sent.
pub struct CommandPlayer {
    config: PlayerConfig,
    stop_after: bool,
    order: PlayOrder,
}

impl CommandPlayer {
    pub fn new(config: PlayerConfig) -> Self {
        Self {
            config,
            stop_after: false,
            order: PlayOrder::Default,
        }
    }

    /// Command-line arguments for `action`, or `None` if it does nothing
    pub fn args_for(&self, action: ChordAction) -> Option<Vec<String>> {
        let next_order = self.order.toggled().name();
        if let Some(custom) = self.config.args.get(action.as_str()) {
            if custom.is_empty() {
                return None;
            }
            return Some(
                custom
                    .iter()
                    .map(|arg| arg.replace("{order}", next_order))
                    .collect(),
            );
        }

        let arg = match action {
            ChordAction::PlayPause => "/playpause".to_string(),
            ChordAction::Next => "/next".to_string(),
            ChordAction::Previous => "/prev".to_string(),
            ChordAction::RateUp => "/runcmd-playing=Playback Statistics/Rating/+".to_string(),
            ChordAction::RateDown => "/runcmd-playing=Playback Statistics/Rating/-".to_string(),
            ChordAction::StopAfterCurrent => "/command:Stop after current".to_string(),
            ChordAction::ToggleShuffle => format!("/runcmd=Playback/Order/{next_order}"),
            // No stock switch; bind one under [player.args] to enable
            ChordAction::VolumeDown | ChordAction::VolumeUp => return None,
        };
        Some(vec![arg])
    }

    fn launch(&self, args: &[String]) -> Result<(), PlayerError> {
        let exe = self.config.exe.as_ref().ok_or(PlayerError::NotConfigured)?;
        let exe_name = exe.display().to_string();
        debug!("Player: {} {:?}", exe_name, args);

        let status = Command::new(exe)
            .args(args)
            .status()
            .map_err(|e| PlayerError::Launch {
                exe: exe_name.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            return Err(PlayerError::Failed {
                exe: exe_name,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl MediaController for CommandPlayer {
    fn perform(&mut self, action: ChordAction) -> Result<(), PlayerError> {
        let Some(args) = self.args_for(action) else {
            debug!("Player: nothing bound to {}", action);
            return Ok(());
        };
        self.launch(&args)?;

        match action {
            ChordAction::StopAfterCurrent => self.stop_after = !self.stop_after,
            ChordAction::ToggleShuffle => {
                self.order = self.order.toggled();
                info!("Player: play order {}", self.order.name());
            }
            _ => {}
        }
        Ok(())
    }

    fn stop_after_current(&self) -> bool {
        self.stop_after
    }
}

enum MediaCommand {
    Perform(ChordAction),
    Shutdown,
}

/// Cloneable handle for queueing actions to a [`MediaWorker`]
#[derive(Clone)]
pub struct MediaSender {
    tx: mpsc::UnboundedSender<MediaCommand>,
}

impl MediaSender {
    /// Queue an action; dropped with a warning if the worker is gone
    pub fn send(&self, action: ChordAction) {
        if self.tx.send(MediaCommand::Perform(action)).is_err() {
            warn!("Media worker stopped, dropping {}", action);
        }
    }
}

/// Thread that owns the media controller and performs queued actions
pub struct MediaWorker {
    tx: mpsc::UnboundedSender<MediaCommand>,
    controller: Arc<Mutex<Box<dyn MediaController>>>,
    thread: Option<JoinHandle<()>>,
}

impl MediaWorker {
    pub fn spawn(controller: Box<dyn MediaController>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller = Arc::new(Mutex::new(controller));

        let worker_controller = Arc::clone(&controller);
        let thread = std::thread::Builder::new()
            .name("macropad-media".into())
            .spawn(move || {
                while let Some(command) = rx.blocking_recv() {
                    match command {
                        MediaCommand::Perform(action) => {
                            if let Err(e) = worker_controller.lock().perform(action) {
                                warn!("Player action {} failed: {}", action, e);
                            }
                        }
                        MediaCommand::Shutdown => break,
                    }
                }
                debug!("Media worker stopped");
            })
            .expect("Failed to spawn media worker thread");

        Self {
            tx,
            controller,
            thread: Some(thread),
        }
    }

    pub fn sender(&self) -> MediaSender {
        MediaSender {
            tx: self.tx.clone(),
        }
    }

    pub fn stop_after_current(&self) -> bool {
        self.controller.lock().stop_after_current()
    }

    /// Finish queued actions and stop the thread
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(MediaCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for MediaWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Player state relevant to the indicator lights
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStatus {
    pub playing: bool,
    pub stop_after: bool,
    /// Track progress, 0-100
    pub percent: Option<u8>,
    /// Track rating, usually 1-5; `None` when unrated
    pub rating: Option<u8>,
    pub artist: String,
    pub title: String,
}

impl PlayerStatus {
    /// Parse now-playing text, pairing each line with the field in `format`
    ///
    /// Unknown field names and unparsable values are ignored.
    pub fn from_now_playing(text: &str, format: &[String]) -> Self {
        let mut status = Self::default();
        for (field, value) in format.iter().zip(text.lines()) {
            let value = value.trim();
            match field.as_str() {
                "playing" => status.playing = value == "playing",
                "percent" => status.percent = value.parse().ok(),
                "rating" => status.rating = value.parse().ok(),
                "artist" => status.artist = value.to_string(),
                "title" => status.title = value.to_string(),
                _ => {}
            }
        }
        status
    }

    /// Read the now-playing file
    pub fn read_now_playing(path: &Path, format: &[String]) -> Result<Self, PlayerError> {
        let text = std::fs::read_to_string(path).map_err(|e| PlayerError::NowPlaying {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_now_playing(&text, format))
    }
}

/// Light showing playback state
pub const PLAYBACK_LIGHT: LightId = 0;
/// Light showing the track rating
pub const RATING_LIGHT: LightId = 1;

/// Colours for the playback and rating lights
///
/// Playback: blue when stopping after the current track, dim white fading
/// to blue with progress while playing, red otherwise. Rating: brighter red
/// for higher ratings, off when unrated.
pub fn status_lights(status: &PlayerStatus) -> [(LightId, Rgb); 2] {
    let playback = if status.stop_after {
        Rgb::BLUE
    } else if status.playing {
        Rgb::new(3, 3, status.percent.unwrap_or(0) / 5)
    } else {
        Rgb::RED
    };

    let rating = match status.rating {
        Some(r) => Rgb::new(r.saturating_mul(2).saturating_add(3), 5, 5),
        None => Rgb::OFF,
    };

    [(PLAYBACK_LIGHT, playback), (RATING_LIGHT, rating)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_args() {
        let player = CommandPlayer::new(PlayerConfig::default());
        assert_eq!(
            player.args_for(ChordAction::PlayPause),
            Some(vec!["/playpause".to_string()])
        );
        assert_eq!(
            player.args_for(ChordAction::ToggleShuffle),
            Some(vec!["/runcmd=Playback/Order/Shuffle (tracks)".to_string()])
        );
        assert_eq!(player.args_for(ChordAction::VolumeUp), None);
    }

    #[test]
    fn test_arg_overrides() {
        let mut config = PlayerConfig::default();
        config
            .args
            .insert("volume-up".into(), vec!["/command:Up".into()]);
        config.args.insert("next".into(), vec![]);
        config
            .args
            .insert("toggle-shuffle".into(), vec!["--order={order}".into()]);
        let player = CommandPlayer::new(config);
        assert_eq!(
            player.args_for(ChordAction::VolumeUp),
            Some(vec!["/command:Up".to_string()])
        );
        assert_eq!(player.args_for(ChordAction::Next), None);
        assert_eq!(
            player.args_for(ChordAction::ToggleShuffle),
            Some(vec!["--order=Shuffle (tracks)".to_string()])
        );
    }

    #[test]
    fn test_unconfigured_player_fails() {
        let mut player = CommandPlayer::new(PlayerConfig::default());
        assert!(matches!(
            player.perform(ChordAction::Next),
            Err(PlayerError::NotConfigured)
        ));
        // Unbound actions succeed without launching anything
        assert!(player.perform(ChordAction::VolumeDown).is_ok());
        assert!(!player.stop_after_current());
    }

    #[test]
    fn test_parse_now_playing() {
        let text = "playing\nArtist\nSong\nAlbum\n4\n55\nart.jpg\n0\n";
        let status = PlayerStatus::from_now_playing(text, &default_now_playing_format());
        assert!(status.playing);
        assert_eq!(status.percent, Some(55));
        assert_eq!(status.rating, Some(4));
        assert_eq!(status.title, "Song");
    }

    #[test]
    fn test_unrated_track() {
        let text = "stopped\nA\nB\nC\n?\n";
        let status = PlayerStatus::from_now_playing(text, &default_now_playing_format());
        assert!(!status.playing);
        assert_eq!(status.rating, None);
        assert_eq!(status.percent, None);
    }

    #[test]
    fn test_status_lights() {
        let mut status = PlayerStatus {
            playing: true,
            percent: Some(50),
            rating: Some(3),
            ..Default::default()
        };
        assert_eq!(
            status_lights(&status),
            [(0, Rgb::new(3, 3, 10)), (1, Rgb::new(9, 5, 5))]
        );

        status.stop_after = true;
        assert_eq!(status_lights(&status)[0], (0, Rgb::new(0, 0, 15)));

        let stopped = PlayerStatus::default();
        assert_eq!(
            status_lights(&stopped),
            [(0, Rgb::new(15, 0, 0)), (1, Rgb::OFF)]
        );
    }

    struct Recorder(Arc<Mutex<Vec<ChordAction>>>);

    impl MediaController for Recorder {
        fn perform(&mut self, action: ChordAction) -> Result<(), PlayerError> {
            self.0.lock().push(action);
            Ok(())
        }
    }

    #[test]
    fn test_worker_performs_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut worker = MediaWorker::spawn(Box::new(Recorder(Arc::clone(&seen))));
        let sender = worker.sender();
        sender.send(ChordAction::Next);
        sender.send(ChordAction::PlayPause);
        worker.shutdown();
        assert_eq!(*seen.lock(), vec![ChordAction::Next, ChordAction::PlayPause]);
    }
}
