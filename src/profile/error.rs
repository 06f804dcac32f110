// Profile error types

use std::fmt;

use thiserror::Error;

/// Which macro of a binding a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroSide {
    Down,
    Up,
}

impl fmt::Display for MacroSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroSide::Down => f.write_str("down"),
            MacroSide::Up => f.write_str("up"),
        }
    }
}

/// A profile violates a hard constraint and must not be encoded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Too many keys bound: {count} (device has {max})")]
    TooManyKeys { count: usize, max: usize },

    #[error("Key {key} {side} macro is too long: {len} codes (max {max})")]
    MacroTooLong {
        key: usize,
        side: MacroSide,
        len: usize,
        max: usize,
    },

    #[error("Key {key}: unknown symbol {symbol:?}")]
    UnknownSymbol { key: usize, symbol: String },
}

/// Loading a profile document from disk failed
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid profile document: {0}")]
    Parse(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
