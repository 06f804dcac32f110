//! Protocol constants and frame builders for the macropad serial link
//!
//! Device to host traffic is newline-delimited ASCII. Host to device traffic
//! is raw bytes: single-byte mode commands, a four-byte light frame, and the
//! program upload frame (`'p'` followed by [`PROG_SIZE`] bytes).
//!
//! The sizes below must stay in sync with the microcontroller firmware.

use crate::error::TransportError;

/// Number of physical keys on the pad
pub const KEYCOUNT: usize = 5;

/// Maximum number of key codes fired by one key transition
pub const MAX_MACRO_SIZE: usize = 4;

/// Bytes used by one key in the program (up group + down group)
pub const FULL_MACRO_SIZE: usize = MAX_MACRO_SIZE * 2;

/// Total size of an encoded macro program
pub const PROG_SIZE: usize = FULL_MACRO_SIZE * KEYCOUNT;

/// Sentinel marking an unused macro slot
pub const MACRO_END: u8 = 132;

/// Highest value accepted by a single colour channel (4-bit colour)
pub const CHANNEL_MAX: u8 = 15;

/// Highest light identifier that fits the single-digit light frame
pub const LIGHT_ID_MAX: u8 = 9;

/// Modifier key codes, as understood by the firmware's keyboard library
pub mod keys {
    pub const CTRL: u8 = 128;
    pub const SHIFT: u8 = 129;
    pub const ALT: u8 = 131;
}

/// Host to device command bytes
pub mod cmd {
    /// Enter keyboard mode
    pub const KEYBOARD_MODE_ON: u8 = b'k';
    /// Exit keyboard mode
    pub const KEYBOARD_MODE_OFF: u8 = b'x';
    /// Program upload prefix
    pub const PROGRAM: u8 = b'p';
}

/// Substrings the firmware prints on keyboard mode transitions
pub mod sentinel {
    /// Printed when the firmware takes over the keys
    pub const KEYBOARD_MODE_ENTER: &str = "kbd";
    /// Printed when the firmware hands the keys back
    pub const KEYBOARD_MODE_LEAVE: &str = "nkb";
}

/// Separator between button index and state in a button line (`"3-1"`)
pub const BUTTON_SEPARATOR: char = '-';

/// Build the single-byte keyboard mode command
pub fn keyboard_mode_frame(on: bool) -> [u8; 1] {
    if on {
        [cmd::KEYBOARD_MODE_ON]
    } else {
        [cmd::KEYBOARD_MODE_OFF]
    }
}

/// Build a light frame: ASCII digit of the light id followed by r, g, b
///
/// Channel values above [`CHANNEL_MAX`] are clamped.
pub fn light_frame(light_id: u8, rgb: [u8; 3]) -> Result<[u8; 4], TransportError> {
    if light_id > LIGHT_ID_MAX {
        return Err(TransportError::InvalidParameter(format!(
            "light id {light_id} out of range 0-{LIGHT_ID_MAX}"
        )));
    }
    Ok([
        b'0' + light_id,
        rgb[0].min(CHANNEL_MAX),
        rgb[1].min(CHANNEL_MAX),
        rgb[2].min(CHANNEL_MAX),
    ])
}

/// Build the program upload frame: `'p'` followed by the encoded program
pub fn program_frame(program: &[u8; PROG_SIZE]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(PROG_SIZE + 1);
    buf.push(cmd::PROGRAM);
    buf.extend_from_slice(program);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prog_size() {
        assert_eq!(PROG_SIZE, 40);
    }

    #[test]
    fn test_keyboard_mode_frame() {
        assert_eq!(keyboard_mode_frame(true), [b'k']);
        assert_eq!(keyboard_mode_frame(false), [b'x']);
    }

    #[test]
    fn test_light_frame_digit_id() {
        assert_eq!(light_frame(1, [3, 4, 5]).unwrap(), [b'1', 3, 4, 5]);
    }

    #[test]
    fn test_light_frame_clamps_channels() {
        assert_eq!(light_frame(0, [20, 15, 255]).unwrap(), [b'0', 15, 15, 15]);
    }

    #[test]
    fn test_light_frame_rejects_wide_id() {
        assert!(matches!(
            light_frame(10, [0, 0, 0]),
            Err(TransportError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_program_frame_prefix() {
        let program = [MACRO_END; PROG_SIZE];
        let frame = program_frame(&program);
        assert_eq!(frame.len(), PROG_SIZE + 1);
        assert_eq!(frame[0], b'p');
        assert!(frame[1..].iter().all(|&b| b == MACRO_END));
    }
}
