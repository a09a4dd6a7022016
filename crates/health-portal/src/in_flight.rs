//! Single-flight gate for save and submit operations

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds an operation's "in flight" flag for as long as it lives.
///
/// Dropping the guard (including when the owning future is dropped) clears
/// the flag, so an abandoned request never leaves its control disabled.
#[derive(Debug)]
pub(crate) struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    /// Raise the flag, or return `None` if it is already raised.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
