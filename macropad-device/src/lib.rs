//! Device session layer for the five-key macropad
//!
//! This crate sits on top of `macropad-transport` and owns one live
//! connection: the reader thread, chord assembly, the light cache that
//! survives keyboard mode, and the binary macro program upload.

pub mod chord;
pub mod error;
pub mod lights;
pub mod mailbox;
pub mod program;
pub mod session;

pub use chord::ChordTracker;
pub use error::SessionError;
pub use lights::{LightCache, LightId, Rgb};
pub use mailbox::ValueMailbox;
pub use program::{encode, to_hex, KeyBinding, MacroProgram, Profile};
pub use session::{
    ButtonCallback, ButtonRelease, DeviceSession, LightUpdate, SessionConfig, SessionState,
};

// Re-export the transport pieces a session user needs
pub use macropad_transport::{BoxedTransport, MemoryTransport, Transport, TransportError};
pub use macropad_transport::{KEYCOUNT, MACRO_END, MAX_MACRO_SIZE, PROG_SIZE};
