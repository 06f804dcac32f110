// Profile compiler
// Expands an authored document into bindings, resolves symbols to key codes
// and validates the result against the firmware limits

use std::fmt;

use macropad_device::{KeyBinding, Profile};
use macropad_transport::protocol::{keys, KEYCOUNT, MACRO_END, MAX_MACRO_SIZE};
use tracing::warn;

use super::document::{BindingSymbols, ProfileDocument};
use super::error::{MacroSide, ValidationError};

/// Non-fatal finding; the profile is still usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// Fewer keys bound than the device has; the rest stay empty
    UnboundKeys { bound: usize },
    /// A binding has no macro for one side; treated as empty
    MissingMacro { key: usize, side: MacroSide },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::UnboundKeys { bound } => {
                write!(f, "not all keys bound ({bound} of {KEYCOUNT})")
            }
            CompileWarning::MissingMacro { key, side } => {
                write!(f, "key {key} has no {side} macro")
            }
        }
    }
}

/// A validated profile plus the warnings raised on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compiled {
    pub profile: Profile,
    pub warnings: Vec<CompileWarning>,
}

/// Resolve one symbol to its wire code
///
/// `CTRL`, `SHIFT` and `ALT` map to the firmware's modifier codes; anything
/// else must be a single character whose code point fits in a byte and lies
/// outside the modifier range up to [`MACRO_END`], which the firmware
/// reserves.
pub fn resolve_symbol(symbol: &str) -> Option<u8> {
    match symbol {
        "CTRL" => Some(keys::CTRL),
        "SHIFT" => Some(keys::SHIFT),
        "ALT" => Some(keys::ALT),
        _ => {
            let mut chars = symbol.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => u8::try_from(u32::from(c))
                    .ok()
                    .filter(|code| !(keys::CTRL..=MACRO_END).contains(code)),
                _ => None,
            }
        }
    }
}

/// Authored binding before symbol resolution
struct Expanded<'a> {
    down: Option<Vec<&'a str>>,
    up: Option<Vec<&'a str>>,
}

fn expand(document: &ProfileDocument) -> Vec<Expanded<'_>> {
    match document {
        ProfileDocument::Simple(symbols) => symbols
            .iter()
            .map(|s| Expanded {
                down: Some(vec![s.as_str()]),
                up: Some(vec![s.as_str()]),
            })
            .collect(),
        ProfileDocument::Symmetric(sequences) => sequences
            .iter()
            .map(|seq| {
                let down: Vec<&str> = seq.iter().map(String::as_str).collect();
                let up = down.iter().rev().copied().collect();
                Expanded {
                    down: Some(down),
                    up: Some(up),
                }
            })
            .collect(),
        ProfileDocument::Complete(bindings) => bindings
            .iter()
            .map(|BindingSymbols { down, up }| Expanded {
                down: down.as_ref().map(|d| d.iter().map(String::as_str).collect()),
                up: up.as_ref().map(|u| u.iter().map(String::as_str).collect()),
            })
            .collect(),
    }
}

fn resolve_side(
    key: usize,
    side: MacroSide,
    symbols: Option<Vec<&str>>,
    warnings: &mut Vec<CompileWarning>,
) -> Result<Vec<u8>, ValidationError> {
    let Some(symbols) = symbols else {
        warnings.push(CompileWarning::MissingMacro { key, side });
        return Ok(Vec::new());
    };
    symbols
        .into_iter()
        .map(|s| {
            resolve_symbol(s).ok_or_else(|| ValidationError::UnknownSymbol {
                key,
                symbol: s.to_string(),
            })
        })
        .collect()
}

fn check_length(key: usize, side: MacroSide, codes: &[u8]) -> Result<(), ValidationError> {
    if codes.len() > MAX_MACRO_SIZE {
        return Err(ValidationError::MacroTooLong {
            key,
            side,
            len: codes.len(),
            max: MAX_MACRO_SIZE,
        });
    }
    Ok(())
}

/// Compile a profile document into a validated [`Profile`]
///
/// More than [`KEYCOUNT`] keys, an over-long macro or an unresolvable symbol
/// fail the whole compile. Fewer keys or a missing side only warn; each
/// warning is logged and returned with the profile.
pub fn compile(document: &ProfileDocument) -> Result<Compiled, ValidationError> {
    let expanded = expand(document);
    let mut warnings = Vec::new();

    let mut bindings = Vec::with_capacity(expanded.len());
    for (key, binding) in expanded.into_iter().enumerate() {
        let down = resolve_side(key, MacroSide::Down, binding.down, &mut warnings)?;
        let up = resolve_side(key, MacroSide::Up, binding.up, &mut warnings)?;
        bindings.push(KeyBinding::new(down, up));
    }

    if bindings.len() > KEYCOUNT {
        return Err(ValidationError::TooManyKeys {
            count: bindings.len(),
            max: KEYCOUNT,
        });
    }
    if bindings.len() < KEYCOUNT {
        warnings.insert(
            0,
            CompileWarning::UnboundKeys {
                bound: bindings.len(),
            },
        );
    }
    for (key, binding) in bindings.iter().enumerate() {
        check_length(key, MacroSide::Down, &binding.down)?;
        check_length(key, MacroSide::Up, &binding.up)?;
    }

    for warning in &warnings {
        warn!("Profile: {}", warning);
    }

    Ok(Compiled {
        profile: Profile::new(bindings),
        warnings,
    })
}
