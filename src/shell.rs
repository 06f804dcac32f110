//! Operator shell commands
//!
//! Commands may be abbreviated to their first letter, except `profiles`
//! which would clash with `prof`.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Quit,
    Help,
    /// Show held buttons
    Buttons,
    /// Show cached lights
    Lights,
    /// Connect to the default port now
    Connect,
    /// Enter (`true`) or leave keyboard mode
    KeyboardMode(bool),
    /// Upload a named profile
    LoadProfile(String),
    /// List profiles and the active one
    Profiles,
    /// Session and presence status; refreshes the player lights
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellParseError {
    Unknown(String),
    MissingArgument(&'static str),
}

impl fmt::Display for ShellParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellParseError::Unknown(cmd) => write!(f, "unknown command {cmd:?}, try help"),
            ShellParseError::MissingArgument(usage) => write!(f, "usage: {usage}"),
        }
    }
}

impl std::error::Error for ShellParseError {}

pub const HELP: &str = "\
Commands:
quit      - quit
help      - help
buttons   - show button state
lights    - show light state
connect   - try to connect right now
key       - go into keyboard mode
ekey      - exit keyboard mode
prof NAME - load profile
profiles  - list profiles and the current one
status    - show connection state and refresh player lights";

impl ShellCommand {
    /// Parse one input line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, ShellParseError> {
        let mut words = line.split_whitespace();
        let Some(cmd) = words.next() else {
            return Ok(None);
        };

        let command = match cmd {
            "q" | "quit" | "exit" => ShellCommand::Quit,
            "h" | "help" | "?" => ShellCommand::Help,
            "b" | "button" | "buttons" => ShellCommand::Buttons,
            "l" | "light" | "lights" => ShellCommand::Lights,
            "c" | "connect" => ShellCommand::Connect,
            "k" | "key" => ShellCommand::KeyboardMode(true),
            "e" | "ekey" => ShellCommand::KeyboardMode(false),
            "p" | "prof" => {
                let name = words
                    .next()
                    .ok_or(ShellParseError::MissingArgument("prof NAME"))?;
                ShellCommand::LoadProfile(name.to_string())
            }
            "profiles" | "listpro" => ShellCommand::Profiles,
            "s" | "status" => ShellCommand::Status,
            other => return Err(ShellParseError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(ShellCommand::parse("q"), Ok(Some(ShellCommand::Quit)));
        assert_eq!(
            ShellCommand::parse("  key "),
            Ok(Some(ShellCommand::KeyboardMode(true)))
        );
        assert_eq!(
            ShellCommand::parse("ekey"),
            Ok(Some(ShellCommand::KeyboardMode(false)))
        );
        assert_eq!(
            ShellCommand::parse("prof media.json"),
            Ok(Some(ShellCommand::LoadProfile("media.json".into())))
        );
        assert_eq!(
            ShellCommand::parse("profiles"),
            Ok(Some(ShellCommand::Profiles))
        );
        assert_eq!(ShellCommand::parse(""), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ShellCommand::parse("prof"),
            Err(ShellParseError::MissingArgument("prof NAME"))
        );
        assert!(matches!(
            ShellCommand::parse("dance"),
            Err(ShellParseError::Unknown(_))
        ));
    }
}
