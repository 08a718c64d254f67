//! Message model

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::{ConversationId, ParticipantId};

/// A unique identifier for a message, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Create a new unique message ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Server-assigned, monotonic commit time (Unix ms)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerTime(pub i64);

/// Ordering key of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timestamp {
    /// Written locally, not yet stamped by the store. Keeps the local
    /// submission time for display only.
    Pending { submitted_at_ms: i64 },
    /// Stamped by the store
    Resolved(ServerTime),
}

impl Timestamp {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    #[must_use]
    pub const fn resolved(&self) -> Option<ServerTime> {
        match self {
            Self::Resolved(time) => Some(*time),
            Self::Pending { .. } => None,
        }
    }

    /// Milliseconds used for display: server time once resolved, local
    /// submission time before that.
    #[must_use]
    pub const fn display_millis(&self) -> i64 {
        match self {
            Self::Resolved(ServerTime(millis)) | Self::Pending { submitted_at_ms: millis } => {
                *millis
            }
        }
    }

    /// Sort order: every resolved time first, ascending; pending after all of
    /// them. Pending values compare equal so a stable sort keeps their
    /// submission order.
    #[must_use]
    pub fn order_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Resolved(a), Self::Resolved(b)) => a.cmp(b),
            (Self::Resolved(_), Self::Pending { .. }) => Ordering::Less,
            (Self::Pending { .. }, Self::Resolved(_)) => Ordering::Greater,
            (Self::Pending { .. }, Self::Pending { .. }) => Ordering::Equal,
        }
    }
}

/// A chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: ParticipantId,
    pub sender_display_name: String,
    pub body: String,
    pub created_at: Timestamp,
    /// Single shared slot, overwritten by either participant
    #[serde(default)]
    pub reaction: Option<String>,
}

impl Message {
    #[must_use]
    pub fn is_from(&self, participant: &ParticipantId) -> bool {
        self.sender_id == *participant
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.created_at.is_pending()
    }
}

/// Record appended to a conversation collection. The store assigns the id
/// and the server time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub conversation_id: ConversationId,
    pub sender_id: ParticipantId,
    pub sender_display_name: String,
    pub body: String,
    pub submitted_at_ms: i64,
}

/// Put a snapshot into view order.
///
/// The sort is stable: messages with the same server time, and pending
/// messages among themselves, keep the order in which they arrived.
#[must_use]
pub fn order_snapshot(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.created_at.order_cmp(&b.created_at));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(body: &str, created_at: Timestamp) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: crate::identity::derive_conversation_id("u1", "u2").unwrap(),
            sender_id: ParticipantId::new("u1").unwrap(),
            sender_display_name: "One".to_string(),
            body: body.to_string(),
            created_at,
            reaction: None,
        }
    }

    fn bodies(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.body.as_str()).collect()
    }

    #[test]
    fn test_message_id_parse() {
        let id = MessageId::new();
        let parsed: MessageId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_resolved_sorts_before_pending() {
        let ordered = order_snapshot(vec![
            message("pending", Timestamp::Pending { submitted_at_ms: 1 }),
            message("late", Timestamp::Resolved(ServerTime(20))),
            message("early", Timestamp::Resolved(ServerTime(10))),
        ]);
        assert_eq!(bodies(&ordered), vec!["early", "late", "pending"]);
    }

    #[test]
    fn test_equal_server_times_keep_arrival_order() {
        let ordered = order_snapshot(vec![
            message("first", Timestamp::Resolved(ServerTime(5))),
            message("second", Timestamp::Resolved(ServerTime(5))),
            message("zero", Timestamp::Resolved(ServerTime(1))),
            message("third", Timestamp::Resolved(ServerTime(5))),
        ]);
        assert_eq!(bodies(&ordered), vec!["zero", "first", "second", "third"]);
    }

    #[test]
    fn test_pending_keep_submission_order() {
        // Local clocks are display-only; arrival order wins among pending.
        let ordered = order_snapshot(vec![
            message("a", Timestamp::Pending { submitted_at_ms: 900 }),
            message("b", Timestamp::Pending { submitted_at_ms: 100 }),
            message("c", Timestamp::Resolved(ServerTime(50))),
        ]);
        assert_eq!(bodies(&ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_display_millis() {
        assert_eq!(Timestamp::Resolved(ServerTime(42)).display_millis(), 42);
        assert_eq!(
            Timestamp::Pending { submitted_at_ms: 7 }.display_millis(),
            7
        );
    }

    #[test]
    fn test_timestamp_serde_shape() {
        let json = serde_json::to_string(&Timestamp::Resolved(ServerTime(3))).unwrap();
        assert_eq!(json, r#"{"resolved":3}"#);
        let pending: Timestamp =
            serde_json::from_str(r#"{"pending":{"submitted_at_ms":9}}"#).unwrap();
        assert_eq!(pending, Timestamp::Pending { submitted_at_ms: 9 });
    }
}
