//! Data models for Duet

mod conversation;
mod message;
mod participant;

pub use conversation::Conversation;
pub use message::{order_snapshot, Message, MessageDraft, MessageId, ServerTime, Timestamp};
pub use participant::Participant;
