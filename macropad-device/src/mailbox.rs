//! Single-slot mailbox for out-of-band device values
//!
//! The read loop deposits every non-button, non-mode line here. A newer value
//! overwrites an uncollected older one; there is no queue.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
pub struct ValueMailbox {
    slot: Mutex<Option<String>>,
    ready: Condvar,
}

impl ValueMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any uncollected one, and wake one waiter
    pub fn put(&self, value: String) {
        *self.slot.lock() = Some(value);
        self.ready.notify_one();
    }

    /// Block up to `timeout` for a value
    pub fn take(&self, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while slot.is_none() {
            if self.ready.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }
        slot.take()
    }
}
