//! Document-level pointer listener lifecycle.
//!
//! While a pointer interaction is active the host must listen for move/up on
//! the whole document, not just the canvas, so releases outside the canvas
//! still end the gesture. `DocumentListeners` tracks whether those listeners
//! are bound and only reports a transition when the state actually changes,
//! so an attach is always paired with exactly one detach.

use tracing::trace;

#[derive(Debug, Default)]
pub struct DocumentListeners {
    attached: bool,
}

impl DocumentListeners {
    /// Mark listeners as bound. Returns `true` if the host must attach them now.
    pub fn attach(&mut self) -> bool {
        if self.attached {
            return false;
        }
        self.attached = true;
        trace!("document listeners attached");
        true
    }

    /// Mark listeners as released. Returns `true` if the host must detach them now.
    pub fn detach(&mut self) -> bool {
        if !self.attached {
            return false;
        }
        self.attached = false;
        trace!("document listeners detached");
        true
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }
}
