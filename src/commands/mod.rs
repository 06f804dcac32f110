//! Command handlers for the CLI application.
//!
//! - `run`: presence monitor, orchestrator and operator shell
//! - `compile`: offline profile compilation
//! - `ports`: serial port listing

pub mod compile;
pub mod ports;
pub mod run;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set up a Ctrl-C handler that sets the given flag to false when triggered.
/// Returns the Arc<AtomicBool> for use in the main loop.
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}
