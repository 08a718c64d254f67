//! Remote document store boundary.
//!
//! The store owns persistence and ordering of committed records. Every live
//! subscription receives the complete ordered record set on each change.

mod memory;

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{Message, MessageDraft, MessageId};

pub use memory::InMemoryStore;

/// Live feed of full ordered snapshots. The feed closing means the
/// transport was interrupted.
pub type SnapshotFeed = mpsc::UnboundedReceiver<Vec<Message>>;

/// Trait for remote message collection operations
pub trait RemoteStore: Send + Sync + 'static {
    /// Open a live query on `path`, ordered by server time ascending.
    ///
    /// The current record set is delivered immediately, then again after
    /// every change. Connection failures return `Error::Transport`.
    fn subscribe(&self, path: &str) -> impl Future<Output = Result<SnapshotFeed>> + Send;

    /// Append a record; the store assigns its id and server time.
    fn append(
        &self,
        path: &str,
        draft: MessageDraft,
    ) -> impl Future<Output = Result<Message>> + Send;

    /// Overwrite the reaction slot of one record.
    fn patch_reaction(
        &self,
        path: &str,
        id: &MessageId,
        reaction: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
