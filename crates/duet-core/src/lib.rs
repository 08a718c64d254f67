//! duet-core - Core library for Duet
//!
//! This crate contains the conversation synchronization engine shared by all
//! Duet front ends: canonical conversation identity, the live snapshot
//! subscription, the local message view and the state derived from it
//! (unread counter, typing signal, reactions).

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod presence;
pub mod reactions;
pub mod session;
pub mod state;
pub mod store;
pub mod sync;
pub mod unread;
pub mod util;

pub use client::{ChatClient, ClientUpdate};
pub use config::ChatConfig;
pub use error::{Error, Result, ValidationError};
pub use identity::{derive_conversation_id, ConversationId, ParticipantId};
pub use models::{Message, MessageId, Participant, Timestamp};
pub use session::{AuthState, Session};
