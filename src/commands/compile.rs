//! Offline profile compilation

use std::path::Path;

use anyhow::Context;
use macropad::profile::load_profile_file;
use macropad_device::{encode, to_hex};

/// Compile a profile document and print its program
pub fn compile(file: &Path) -> anyhow::Result<()> {
    let compiled =
        load_profile_file(file).with_context(|| format!("compiling {}", file.display()))?;

    for warning in &compiled.warnings {
        println!("warning: {warning}");
    }
    for (key, binding) in compiled.profile.bindings().iter().enumerate() {
        println!("  key {key}: down {:?} up {:?}", binding.down, binding.up);
    }
    println!("{}", to_hex(&encode(&compiled.profile)));
    Ok(())
}
