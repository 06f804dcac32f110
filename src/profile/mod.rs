// Key binding profiles
// Authored documents, the compiler that turns them into device programs, and
// the on-disk library of named profiles

pub mod compile;
pub mod document;
pub mod error;
pub mod library;

pub use compile::{compile, resolve_symbol, CompileWarning, Compiled};
pub use document::{BindingSymbols, ProfileDocument};
pub use error::{LoadError, MacroSide, ValidationError};
pub use library::{load_profile_file, ProfileLibrary};
