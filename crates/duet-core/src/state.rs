//! Shared connection state types.

use serde::Serialize;

/// Connection state of one live subscription, as shown to the user.
///
/// While `Reconnecting` the last delivered snapshot stays on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Live,
    Reconnecting { attempt: u32 },
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Live)
    }
}
