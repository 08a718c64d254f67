//! Local typing signal with timed decay.
//!
//! Holds a single deadline. Every keystroke replaces it; the signal turns
//! off only when the latest deadline passes. Nothing here is sent to the
//! peer.

use std::time::Duration;

use tokio::time::Instant;

/// Default decay interval of the typing signal.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(1500);

/// Point-in-time view of the typing signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingSignal {
    pub typing: bool,
    pub deadline: Option<Instant>,
}

/// Typing signal of the local user, cleared once its deadline passes
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    interval: Duration,
    deadline: Option<Instant>,
}

impl PresenceTracker {
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Turn the signal on and push the deadline to `now + interval`,
    /// replacing any earlier deadline.
    pub fn mark_typing(&mut self) -> Instant {
        let deadline = Instant::now() + self.interval;
        self.deadline = Some(deadline);
        deadline
    }

    #[must_use]
    pub const fn is_typing(&self) -> bool {
        self.deadline.is_some()
    }

    /// Pending deadline, for the event loop to sleep on.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Called when a timer fires. Clears the signal only if the current
    /// deadline has passed, so a timer armed for an older deadline is a
    /// no-op. Returns true when the signal turned off.
    pub fn expire(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Turn the signal off immediately.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    #[must_use]
    pub const fn signal(&self) -> TypingSignal {
        TypingSignal {
            typing: self.deadline.is_some(),
            deadline: self.deadline,
        }
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_TIMEOUT)
    }
}
