//! In-process document store.
//!
//! Behaves like a hosted realtime store: path-keyed collections, a monotonic
//! server clock, and full ordered snapshots pushed to every subscriber after
//! each commit. Failure switches let callers exercise reconnects and write
//! errors.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use super::{RemoteStore, SnapshotFeed};
use crate::error::{Error, Result};
use crate::models::{order_snapshot, Message, MessageDraft, MessageId, ServerTime, Timestamp};
use crate::util::unix_millis_now;

/// Shared in-memory store; clones refer to the same collections.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<String, Collection>,
    last_server_time: i64,
    failing_connects: u32,
    fail_writes: bool,
    hold_commits: bool,
    append_count: usize,
}

#[derive(Default)]
struct Collection {
    records: Vec<Message>,
    subscribers: Vec<mpsc::UnboundedSender<Vec<Message>>>,
}

impl Collection {
    fn publish(&mut self) {
        let snapshot = order_snapshot(self.records.clone());
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }
}

impl StoreState {
    fn next_server_time(&mut self) -> ServerTime {
        let next = unix_millis_now().max(self.last_server_time + 1);
        self.last_server_time = next;
        ServerTime(next)
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every live feed, as if the connection to the store was lost.
    pub async fn disconnect_all(&self) {
        let mut state = self.state.lock().await;
        let dropped: usize = state
            .collections
            .values_mut()
            .map(|collection| std::mem::take(&mut collection.subscribers).len())
            .sum();
        tracing::debug!(dropped, "Dropped all snapshot feeds");
    }

    /// Refuse the next `count` subscribe attempts with a transport error.
    pub async fn fail_next_connects(&self, count: u32) {
        self.state.lock().await.failing_connects = count;
    }

    /// Make appends and patches fail until switched off.
    pub async fn set_fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }

    /// While held, appends stay pending until [`Self::resolve_pending`].
    pub async fn hold_commits(&self, hold: bool) {
        self.state.lock().await.hold_commits = hold;
    }

    /// Stamp every pending record with a server time, in submission order,
    /// and publish the affected collections.
    pub async fn resolve_pending(&self) -> usize {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let mut resolved = 0;
        for collection in state.collections.values_mut() {
            let mut changed = false;
            for record in &mut collection.records {
                if record.created_at.is_pending() {
                    let next = unix_millis_now().max(state.last_server_time + 1);
                    state.last_server_time = next;
                    record.created_at = Timestamp::Resolved(ServerTime(next));
                    changed = true;
                    resolved += 1;
                }
            }
            if changed {
                collection.publish();
            }
        }
        resolved
    }

    /// Insert `message` as committed at `at` and publish. Records sharing a
    /// server time keep their insertion order.
    pub async fn insert_resolved(&self, path: &str, mut message: Message, at: ServerTime) {
        let mut state = self.state.lock().await;
        state.last_server_time = state.last_server_time.max(at.0);
        message.created_at = Timestamp::Resolved(at);
        let collection = state.collections.entry(path.to_string()).or_default();
        collection.records.push(message);
        collection.publish();
    }

    /// Current ordered record set of `path`.
    pub async fn snapshot(&self, path: &str) -> Vec<Message> {
        let state = self.state.lock().await;
        state
            .collections
            .get(path)
            .map(|collection| order_snapshot(collection.records.clone()))
            .unwrap_or_default()
    }

    /// Number of appends that reached the store.
    pub async fn append_count(&self) -> usize {
        self.state.lock().await.append_count
    }

    /// Number of live feeds on `path`.
    pub async fn subscriber_count(&self, path: &str) -> usize {
        let state = self.state.lock().await;
        state.collections.get(path).map_or(0, |collection| {
            collection
                .subscribers
                .iter()
                .filter(|subscriber| !subscriber.is_closed())
                .count()
        })
    }
}

impl RemoteStore for InMemoryStore {
    async fn subscribe(&self, path: &str) -> Result<SnapshotFeed> {
        let mut state = self.state.lock().await;
        if state.failing_connects > 0 {
            state.failing_connects -= 1;
            return Err(Error::Transport(format!("connection to {path} refused")));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let collection = state.collections.entry(path.to_string()).or_default();
        let initial = order_snapshot(collection.records.clone());
        if sender.send(initial).is_ok() {
            collection.subscribers.push(sender);
        }
        Ok(receiver)
    }

    async fn append(&self, path: &str, draft: MessageDraft) -> Result<Message> {
        let mut state = self.state.lock().await;
        if state.fail_writes {
            return Err(Error::Write(format!("append to {path} rejected")));
        }

        let created_at = if state.hold_commits {
            Timestamp::Pending {
                submitted_at_ms: draft.submitted_at_ms,
            }
        } else {
            Timestamp::Resolved(state.next_server_time())
        };
        let message = Message {
            id: MessageId::new(),
            conversation_id: draft.conversation_id,
            sender_id: draft.sender_id,
            sender_display_name: draft.sender_display_name,
            body: draft.body,
            created_at,
            reaction: None,
        };

        state.append_count += 1;
        let collection = state.collections.entry(path.to_string()).or_default();
        collection.records.push(message.clone());
        collection.publish();
        Ok(message)
    }

    async fn patch_reaction(&self, path: &str, id: &MessageId, reaction: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.fail_writes {
            return Err(Error::Write(format!("patch of {path}/{id} rejected")));
        }

        let not_found = || Error::NotFound(format!("{path}/{id}"));
        let collection = state.collections.get_mut(path).ok_or_else(not_found)?;
        let record = collection
            .records
            .iter_mut()
            .find(|record| record.id == *id)
            .ok_or_else(not_found)?;
        record.reaction = Some(reaction.to_string());
        collection.publish();
        Ok(())
    }
}
