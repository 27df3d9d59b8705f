//! Stop flags - One-shot propagation suppression.
//!
//! A flag is armed explicitly with [`StopFlags::arm`] and consumed by the first
//! traversal that visits the node while it is armed. Consuming disarms it, so
//! the next traversal passes through unless the flag is armed again.
//!
//! ```text
//! ARMED --(traversal visits node)--> CONSUMED --> DISARMED
//! ```

use std::collections::HashSet;

/// Per-node, per-event one-shot stop flags.
#[derive(Debug, Clone, Default)]
pub struct StopFlags {
    armed: HashSet<String>,
}

impl StopFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the flag for `event`. Arming twice is the same as arming once.
    pub fn arm(&mut self, event: &str) {
        self.armed.insert(event.to_string());
    }

    pub fn is_armed(&self, event: &str) -> bool {
        self.armed.contains(event)
    }

    /// Disarm and return true if the flag for `event` was armed.
    pub fn consume_if_armed(&mut self, event: &str) -> bool {
        self.armed.remove(event)
    }

    /// Disarm every flag.
    pub fn clear(&mut self) {
        self.armed.clear();
    }
}
