//! Operator-facing progress callbacks.
//!
//! The pipeline narrates what it is doing through [`Progress`]; the CLI
//! renders it to the terminal. Every method has a no-op default.

use std::sync::Mutex;

use nixup_core::WorkingTreeChange;

pub trait Progress {
    /// A new top-level step began (`"Fetching from remote"`).
    fn step(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    /// The change manifest about to be staged.
    fn changes(&self, _changes: &[WorkingTreeChange]) {}
    /// The live rebuild is about to take over the terminal.
    fn rebuild_started(&self, _flake_ref: &str) {}
    fn rebuild_finished(&self, _success: bool) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl Progress for SilentProgress {}

/// Records every callback as a `kind: message` line (testing).
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    fn push(&self, kind: &str, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(format!("{kind}: {message}"));
        }
    }
}

impl Progress for RecordingProgress {
    fn step(&self, message: &str) {
        self.push("step", message);
    }

    fn info(&self, message: &str) {
        self.push("info", message);
    }

    fn success(&self, message: &str) {
        self.push("success", message);
    }

    fn warning(&self, message: &str) {
        self.push("warning", message);
    }

    fn changes(&self, changes: &[WorkingTreeChange]) {
        for change in changes {
            self.push("change", &format!("{} {}", change.kind(), change.path));
        }
    }

    fn rebuild_started(&self, flake_ref: &str) {
        self.push("rebuild", flake_ref);
    }

    fn rebuild_finished(&self, success: bool) {
        self.push("rebuilt", if success { "ok" } else { "failed" });
    }
}
