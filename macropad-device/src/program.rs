//! Binary macro program
//!
//! A [`Profile`] holds one [`KeyBinding`] per physical key, already resolved
//! to numeric key codes. [`encode`] lays it out in the fixed-size buffer the
//! firmware expects:
//!
//! ```text
//! key 4: up[3] up[2] up[1] up[0]  down[3] down[2] down[1] down[0]
//! key 3: ...
//! ...
//! key 0: up[3] up[2] up[1] up[0]  down[3] down[2] down[1] down[0]
//! ```
//!
//! Keys run from high to low and every group is written last slot first, so
//! a short macro sits at the tail of its group. Missing keys and unused slots
//! hold [`MACRO_END`].

use macropad_transport::protocol::{FULL_MACRO_SIZE, KEYCOUNT, MACRO_END, MAX_MACRO_SIZE, PROG_SIZE};

/// Encoded macro program, ready for upload
pub type MacroProgram = [u8; PROG_SIZE];

/// Key codes fired by one physical key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBinding {
    /// Fired on press, in order
    pub down: Vec<u8>,
    /// Fired on release, in order
    pub up: Vec<u8>,
}

impl KeyBinding {
    pub fn new(down: Vec<u8>, up: Vec<u8>) -> Self {
        Self { down, up }
    }

    /// Whether both macros fit in [`MAX_MACRO_SIZE`] slots
    pub fn fits(&self) -> bool {
        self.down.len() <= MAX_MACRO_SIZE && self.up.len() <= MAX_MACRO_SIZE
    }
}

/// Ordered key bindings, indexed by physical key number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    bindings: Vec<KeyBinding>,
}

impl Profile {
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self { bindings }
    }

    pub fn bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// Binding for a physical key, if the profile defines it
    pub fn binding(&self, key: usize) -> Option<&KeyBinding> {
        self.bindings.get(key)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Write one macro group, last slot first
fn write_group(out: &mut [u8], codes: Option<&[u8]>) {
    for (pos, slot) in (0..MAX_MACRO_SIZE).rev().enumerate() {
        out[pos] = codes
            .and_then(|c| c.get(slot))
            .copied()
            .unwrap_or(MACRO_END);
    }
}

/// Encode a profile into the firmware's program layout
///
/// Never fails: bindings past [`KEYCOUNT`] are ignored and codes past
/// [`MAX_MACRO_SIZE`] are dropped, so callers should validate first.
pub fn encode(profile: &Profile) -> MacroProgram {
    let mut program = [MACRO_END; PROG_SIZE];
    for (group, key) in (0..KEYCOUNT).rev().enumerate() {
        let binding = profile.binding(key);
        let base = group * FULL_MACRO_SIZE;
        write_group(
            &mut program[base..base + MAX_MACRO_SIZE],
            binding.map(|b| b.up.as_slice()),
        );
        write_group(
            &mut program[base + MAX_MACRO_SIZE..base + FULL_MACRO_SIZE],
            binding.map(|b| b.down.as_slice()),
        );
    }
    program
}

/// Render a program as lowercase hex, for logs and the CLI
pub fn to_hex(program: &[u8]) -> String {
    program.iter().map(|b| format!("{b:02x}")).collect()
}
