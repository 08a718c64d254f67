//! Canonical conversation identity for a pair of participants.
//!
//! Both clients derive the same id from the same unordered pair, so they meet
//! on one collection without a separate creation step.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Separator between the two participant ids. Valid participant ids never
/// contain it, which keeps derivation injective.
pub const CONVERSATION_ID_DELIMITER: char = '_';

/// Identifier of a participant, as issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Validate and wrap a raw participant id
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(Error::InvalidParticipant(
                "participant id must not be empty".to_string(),
            ));
        }
        if raw.contains(CONVERSATION_ID_DELIMITER) {
            return Err(Error::InvalidParticipant(format!(
                "participant id '{raw}' must not contain '{CONVERSATION_ID_DELIMITER}'"
            )));
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(value: ParticipantId) -> Self {
        value.0
    }
}

/// Identifier of a two-party conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Collection path of this conversation's messages under `root`.
    #[must_use]
    pub fn messages_path(&self, root: &str) -> String {
        format!("{root}/{}/messages", self.0)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the conversation id shared by `a` and `b`.
///
/// Commutative: the ids are ordered lexicographically before joining, so
/// `derive_conversation_id("u2", "u1")` is `"u1_u2"` as well.
///
/// ```
/// use duet_core::derive_conversation_id;
///
/// let id = derive_conversation_id("u2", "u1").unwrap();
/// assert_eq!(id.as_str(), "u1_u2");
/// ```
pub fn derive_conversation_id(a: &str, b: &str) -> Result<ConversationId> {
    let a = ParticipantId::new(a)?;
    let b = ParticipantId::new(b)?;
    Ok(conversation_id_for(&a, &b))
}

/// Same as [`derive_conversation_id`] for ids that are already validated.
#[must_use]
pub fn conversation_id_for(a: &ParticipantId, b: &ParticipantId) -> ConversationId {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    ConversationId(format!("{first}{CONVERSATION_ID_DELIMITER}{second}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_matches_known_scenario() {
        assert_eq!(derive_conversation_id("u1", "u2").unwrap().as_str(), "u1_u2");
        assert_eq!(derive_conversation_id("u2", "u1").unwrap().as_str(), "u1_u2");
    }

    #[test]
    fn derivation_is_commutative() {
        let pairs = [
            ("alice", "bob"),
            ("Zed", "amy"),
            ("x", "x"),
            ("9kQzL2", "9kQzL"),
        ];
        for (a, b) in pairs {
            assert_eq!(
                derive_conversation_id(a, b).unwrap(),
                derive_conversation_id(b, a).unwrap()
            );
        }
    }

    #[test]
    fn distinct_pairs_do_not_collide() {
        let ab = derive_conversation_id("a", "bc").unwrap();
        let ac = derive_conversation_id("ab", "c").unwrap();
        assert_ne!(ab, ac);

        let with_b = derive_conversation_id("u1", "u2").unwrap();
        let with_c = derive_conversation_id("u1", "u3").unwrap();
        assert_ne!(with_b, with_c);
    }

    #[test]
    fn empty_participant_is_rejected() {
        assert!(matches!(
            derive_conversation_id("", "u2"),
            Err(Error::InvalidParticipant(_))
        ));
        assert!(matches!(
            derive_conversation_id("u1", "  "),
            Err(Error::InvalidParticipant(_))
        ));
    }

    #[test]
    fn delimiter_inside_id_is_rejected() {
        assert!(matches!(
            derive_conversation_id("a_b", "c"),
            Err(Error::InvalidParticipant(_))
        ));
    }

    #[test]
    fn messages_path_is_namespaced_by_conversation() {
        let id = derive_conversation_id("u2", "u1").unwrap();
        assert_eq!(id.messages_path("chats"), "chats/u1_u2/messages");
    }

    #[test]
    fn participant_id_deserialization_validates() {
        let parsed: ParticipantId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(parsed.as_str(), "u1");
        assert!(serde_json::from_str::<ParticipantId>("\"\"").is_err());
    }
}
