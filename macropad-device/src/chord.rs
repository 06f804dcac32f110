//! Chord assembly from press/release events
//!
//! A chord is the ordered list of buttons currently held. Only the session
//! read loop mutates it.

use macropad_transport::KEYCOUNT;

/// Held buttons in press order, plus the per-button held flags
#[derive(Debug, Clone, Default)]
pub struct ChordTracker {
    chord: Vec<u8>,
    held: [bool; KEYCOUNT],
}

impl ChordTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press; returns `false` if the button was already in the chord
    ///
    /// A button appears at most once per hold, so a repeated press line is
    /// not appended again.
    pub fn press(&mut self, button: u8) -> bool {
        if let Some(flag) = self.held.get_mut(button as usize) {
            *flag = true;
        }
        if self.chord.contains(&button) {
            return false;
        }
        self.chord.push(button);
        true
    }

    /// Record a release, calling `f` with the chord *before* the button leaves it
    pub fn release<R>(&mut self, button: u8, f: impl FnOnce(&[u8]) -> R) -> R {
        if let Some(flag) = self.held.get_mut(button as usize) {
            *flag = false;
        }
        let result = f(&self.chord);
        self.chord.retain(|&b| b != button);
        result
    }

    /// Currently held buttons, in press order
    pub fn chord(&self) -> &[u8] {
        &self.chord
    }

    /// Held flag for every button
    pub fn held(&self) -> [bool; KEYCOUNT] {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_sees_full_chord() {
        let mut t = ChordTracker::new();
        t.press(1);
        t.press(2);
        let seen = t.release(1, |chord| chord.to_vec());
        assert_eq!(seen, vec![1, 2]);
        assert_eq!(t.chord(), &[2]);
    }

    #[test]
    fn test_repeated_press_not_duplicated() {
        let mut t = ChordTracker::new();
        assert!(t.press(3));
        assert!(!t.press(3));
        assert_eq!(t.chord(), &[3]);
        t.release(3, |_| ());
        assert!(t.chord().is_empty());
    }

    #[test]
    fn test_release_without_press() {
        let mut t = ChordTracker::new();
        t.press(0);
        let seen = t.release(4, |chord| chord.to_vec());
        assert_eq!(seen, vec![0]);
        assert_eq!(t.chord(), &[0]);
    }

    #[test]
    fn test_held_flags() {
        let mut t = ChordTracker::new();
        t.press(0);
        t.press(4);
        assert_eq!(t.held(), [true, false, false, false, true]);
        t.release(0, |_| ());
        assert_eq!(t.held(), [false, false, false, false, true]);
    }
}
