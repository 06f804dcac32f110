//! Indicator light types and the host-side light cache

use std::collections::BTreeMap;
use std::fmt;

use macropad_transport::protocol::CHANNEL_MAX;

/// Light identifier (0-9)
pub type LightId = u8;

/// RGB colour with 4-bit channels (0-15)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a colour; channels above 15 are clamped
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r.min(CHANNEL_MAX),
            g: g.min(CHANNEL_MAX),
            b: b.min(CHANNEL_MAX),
        }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub const OFF: Self = Self { r: 0, g: 0, b: 0 };
    pub const RED: Self = Self { r: 15, g: 0, b: 0 };
    pub const BLUE: Self = Self { r: 0, g: 0, b: 15 };
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.r, self.g, self.b)
    }
}

/// Last requested colour per light
///
/// The firmware forgets light state while in keyboard mode; the cache is
/// replayed in ascending id order when it hands the keys back.
#[derive(Debug, Clone, Default)]
pub struct LightCache {
    entries: BTreeMap<LightId, Rgb>,
}

impl LightCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: LightId, rgb: Rgb) {
        self.entries.insert(id, rgb);
    }

    /// Entries in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (LightId, Rgb)> + '_ {
        self.entries.iter().map(|(&id, &rgb)| (id, rgb))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
