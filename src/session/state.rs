//! Shared session flags
//!
//! The one struct every asynchronous path sees. Flags are atomics with one
//! writer-class each: `agent_speaking` is written only by the playback
//! path, `muted` only by the host, `closed` only by teardown. The capture
//! callback and the timer read them concurrently; a read observing a value
//! a few milliseconds stale is within tolerance.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct SessionState {
    agent_speaking: AtomicBool,
    muted: AtomicBool,
    closed: AtomicBool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_agent_speaking(&self) -> bool {
        self.agent_speaking.load(Ordering::SeqCst)
    }

    pub fn set_agent_speaking(&self, speaking: bool) {
        self.agent_speaking.store(speaking, Ordering::SeqCst);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Mark the session closed. Returns true only for the call that
    /// actually flipped the flag, making teardown idempotent.
    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }
}
