//! Conversation model

use serde::{Deserialize, Serialize};

use crate::identity::{conversation_id_for, ConversationId, ParticipantId};

/// A two-party conversation. Participants are kept in canonical order so
/// both sides build an identical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant_a: ParticipantId,
    pub participant_b: ParticipantId,
}

impl Conversation {
    #[must_use]
    pub fn between(a: ParticipantId, b: ParticipantId) -> Self {
        let id = conversation_id_for(&a, &b);
        let (participant_a, participant_b) = if a <= b { (a, b) } else { (b, a) };
        Self {
            id,
            participant_a,
            participant_b,
        }
    }

    /// The other side of the conversation, or `None` if `me` is not in it.
    #[must_use]
    pub fn peer_of(&self, me: &ParticipantId) -> Option<&ParticipantId> {
        if *me == self.participant_a {
            Some(&self.participant_b)
        } else if *me == self.participant_b {
            Some(&self.participant_a)
        } else {
            None
        }
    }
}
