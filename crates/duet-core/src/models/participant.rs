//! Participant model

use serde::{Deserialize, Serialize};

use crate::identity::ParticipantId;

/// A chat participant, owned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    /// Populated by whoever supplies the directory; nothing in this crate
    /// writes it.
    #[serde(default)]
    pub online: bool,
}

impl Participant {
    #[must_use]
    pub fn new(id: ParticipantId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            online: false,
        }
    }
}
