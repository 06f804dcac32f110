//! Chord to action mapping
//!
//! The device session only reports chords; what a chord means lives here as
//! a plain lookup table. Keys are matched as exact ordered sequences, so
//! `[1, 2]` (hold 1, then press 2) and `[2, 1]` are different chords.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Media action a chord can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChordAction {
    PlayPause,
    StopAfterCurrent,
    VolumeDown,
    VolumeUp,
    Next,
    Previous,
    RateUp,
    RateDown,
    ToggleShuffle,
}

impl ChordAction {
    pub const ALL: &'static [ChordAction] = &[
        ChordAction::PlayPause,
        ChordAction::StopAfterCurrent,
        ChordAction::VolumeDown,
        ChordAction::VolumeUp,
        ChordAction::Next,
        ChordAction::Previous,
        ChordAction::RateUp,
        ChordAction::RateDown,
        ChordAction::ToggleShuffle,
    ];

    /// Config name (kebab-case)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChordAction::PlayPause => "play-pause",
            ChordAction::StopAfterCurrent => "stop-after-current",
            ChordAction::VolumeDown => "volume-down",
            ChordAction::VolumeUp => "volume-up",
            ChordAction::Next => "next",
            ChordAction::Previous => "previous",
            ChordAction::RateUp => "rate-up",
            ChordAction::RateDown => "rate-down",
            ChordAction::ToggleShuffle => "toggle-shuffle",
        }
    }
}

impl fmt::Display for ChordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `[[chords]]` entry in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordBinding {
    pub keys: Vec<u8>,
    pub action: ChordAction,
}

/// Exact-sequence chord lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordMap {
    actions: HashMap<Vec<u8>, ChordAction>,
}

impl ChordMap {
    /// Empty map; no chord does anything
    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// The stock media layout
    pub fn builtin() -> Self {
        let mut map = Self::empty();
        map.bind(vec![1], ChordAction::PlayPause);
        map.bind(vec![1, 2], ChordAction::StopAfterCurrent);
        map.bind(vec![2], ChordAction::VolumeDown);
        map.bind(vec![3], ChordAction::VolumeUp);
        map.bind(vec![0], ChordAction::Next);
        map.bind(vec![4], ChordAction::Previous);
        map.bind(vec![1, 0], ChordAction::RateUp);
        map.bind(vec![1, 4], ChordAction::RateDown);
        map.bind(vec![2, 1], ChordAction::ToggleShuffle);
        map
    }

    /// Built-in layout with `overrides` applied on top
    pub fn with_overrides(overrides: &[ChordBinding]) -> Self {
        let mut map = Self::builtin();
        for binding in overrides {
            map.bind(binding.keys.clone(), binding.action);
        }
        map
    }

    pub fn bind(&mut self, keys: Vec<u8>, action: ChordAction) {
        self.actions.insert(keys, action);
    }

    pub fn lookup(&self, chord: &[u8]) -> Option<ChordAction> {
        self.actions.get(chord).copied()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Default for ChordMap {
    fn default() -> Self {
        Self::builtin()
    }
}
