//! Classification of device lines
//!
//! Every line the firmware prints falls into one of three kinds:
//!
//! - button transitions, `"<index>-<0|1>"`
//! - keyboard mode sentinels (`kbd` on entry, `nkb` on exit)
//! - anything else, which is an out-of-band value response
//!
//! The wire is noisy (partial lines after reset, boot chatter), so parse
//! failures are ordinary results rather than faults.

use std::fmt;

use crate::protocol::{sentinel, BUTTON_SEPARATOR, KEYCOUNT};

/// Keyboard mode transition reported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeChange {
    /// Firmware took over the keys
    Entered,
    /// Firmware handed the keys back to the host
    Left,
}

/// A successfully classified device line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceLine {
    /// Physical button pressed or released
    Button { index: u8, pressed: bool },
    /// Keyboard mode sentinel
    Mode(ModeChange),
    /// Out-of-band value response (line endings stripped)
    Value(String),
}

/// Why a line was discarded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Blank line
    Empty,
    /// Looked like a button line but a field was not numeric
    MalformedButton(String),
    /// Button index outside `0..KEYCOUNT`
    ButtonOutOfRange(u32),
    /// Button state other than 0 or 1
    InvalidState(u32),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::MalformedButton(line) => write!(f, "malformed button line: {line:?}"),
            Self::ButtonOutOfRange(i) => write!(f, "button index {i} out of range"),
            Self::InvalidState(s) => write!(f, "invalid button state {s}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Classify one line read from the device
///
/// Button lines are recognised by the separator first, so a line such as
/// `"x-kbd"` is a malformed button line, never a mode sentinel.
pub fn parse_line(raw: &str) -> Result<DeviceLine, ParseError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    if line.contains(BUTTON_SEPARATOR) {
        return parse_button(line);
    }

    if line.contains(sentinel::KEYBOARD_MODE_ENTER) {
        Ok(DeviceLine::Mode(ModeChange::Entered))
    } else if line.contains(sentinel::KEYBOARD_MODE_LEAVE) {
        Ok(DeviceLine::Mode(ModeChange::Left))
    } else {
        Ok(DeviceLine::Value(line.to_string()))
    }
}

fn parse_button(line: &str) -> Result<DeviceLine, ParseError> {
    let mut fields = line.split(BUTTON_SEPARATOR);
    let malformed = || ParseError::MalformedButton(line.to_string());

    let index: u32 = fields
        .next()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(malformed)?;
    let state: u32 = fields
        .next()
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(malformed)?;

    if index as usize >= KEYCOUNT {
        return Err(ParseError::ButtonOutOfRange(index));
    }
    let pressed = match state {
        0 => false,
        1 => true,
        other => return Err(ParseError::InvalidState(other)),
    };

    Ok(DeviceLine::Button {
        index: index as u8,
        pressed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_press_and_release() {
        assert_eq!(
            parse_line("3-1\r\n"),
            Ok(DeviceLine::Button {
                index: 3,
                pressed: true
            })
        );
        assert_eq!(
            parse_line("0-0\n"),
            Ok(DeviceLine::Button {
                index: 0,
                pressed: false
            })
        );
    }

    #[test]
    fn test_parse_tolerates_field_whitespace() {
        assert_eq!(
            parse_line(" 2 - 1 \r\n"),
            Ok(DeviceLine::Button {
                index: 2,
                pressed: true
            })
        );
    }

    #[test]
    fn test_out_of_range_button_discarded() {
        assert_eq!(parse_line("5-1"), Err(ParseError::ButtonOutOfRange(5)));
    }

    #[test]
    fn test_non_numeric_button_discarded() {
        assert!(matches!(
            parse_line("a-1"),
            Err(ParseError::MalformedButton(_))
        ));
        assert!(matches!(
            parse_line("1-"),
            Err(ParseError::MalformedButton(_))
        ));
    }

    #[test]
    fn test_bad_state_discarded() {
        assert_eq!(parse_line("1-7"), Err(ParseError::InvalidState(7)));
    }

    #[test]
    fn test_mode_sentinels() {
        assert_eq!(
            parse_line("entering kbd mode\r\n"),
            Ok(DeviceLine::Mode(ModeChange::Entered))
        );
        assert_eq!(
            parse_line("nkb\r\n"),
            Ok(DeviceLine::Mode(ModeChange::Left))
        );
    }

    #[test]
    fn test_separator_wins_over_sentinel() {
        assert!(matches!(
            parse_line("x-kbd"),
            Err(ParseError::MalformedButton(_))
        ));
    }

    #[test]
    fn test_value_line() {
        assert_eq!(
            parse_line("v1.2\r\n"),
            Ok(DeviceLine::Value("v1.2".to_string()))
        );
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(parse_line("\r\n"), Err(ParseError::Empty));
        assert_eq!(parse_line(""), Err(ParseError::Empty));
    }
}
