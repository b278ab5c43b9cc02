//! Cooperative shutdown flag
//!
//! One process-wide `AtomicBool`. `request` is a single store, so it may be
//! called from a signal handler. Training never polls it; the session loop
//! does, between epochs.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Ask the running session to stop after the current epoch.
pub fn request() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

pub fn check() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Clear the flag before a new run.
pub fn reset() {
    SHUTDOWN.store(false, Ordering::SeqCst);
}
