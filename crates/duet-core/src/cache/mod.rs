//! Local view of one conversation.
//!
//! Holds the latest snapshot and mediates submission. The view only ever
//! changes by wholesale replacement from the live subscription; a submitted
//! message shows up once the store reports it.

mod grouping;

use std::future::Future;
use std::sync::Arc;

pub use grouping::{group_by_day, group_by_day_in, DayGroup};

use crate::error::{Result, ValidationError};
use crate::identity::ConversationId;
use crate::models::{order_snapshot, Message, MessageDraft, MessageId};
use crate::session::Session;
use crate::store::RemoteStore;
use crate::util::{is_blank, unix_millis_now};

/// Ordered view of one conversation plus its write path
pub struct LocalMessageCache<S: RemoteStore> {
    store: Arc<S>,
    conversation_id: ConversationId,
    path: String,
    view: Vec<Message>,
}

impl<S: RemoteStore> LocalMessageCache<S> {
    pub fn new(store: Arc<S>, conversation_id: ConversationId, collection_root: &str) -> Self {
        let path = conversation_id.messages_path(collection_root);
        Self {
            store,
            conversation_id,
            path,
            view: Vec::new(),
        }
    }

    pub const fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Append a message from the signed-in user.
    ///
    /// Blank bodies and a missing sender are rejected here, before the store
    /// is touched. The returned future owns the write and borrows nothing, so
    /// it can be spawned while the view keeps receiving snapshots. The body
    /// is stored as typed. Store failures come back as `Error::Write` and are
    /// not retried.
    pub fn submit(
        &self,
        session: &Session,
        body: &str,
    ) -> Result<impl Future<Output = Result<()>> + Send + 'static> {
        if is_blank(body) {
            return Err(ValidationError::EmptyBody.into());
        }
        let sender = session
            .current_user()
            .ok_or(ValidationError::MissingSender)?;

        let draft = MessageDraft {
            conversation_id: self.conversation_id.clone(),
            sender_id: sender.id,
            sender_display_name: sender.display_name,
            body: body.to_string(),
            submitted_at_ms: unix_millis_now(),
        };
        let store = Arc::clone(&self.store);
        let path = self.path.clone();

        Ok(async move {
            let conversation_id = draft.conversation_id.clone();
            match store.append(&path, draft).await {
                Ok(message) => {
                    tracing::debug!(
                        conversation = %conversation_id,
                        message = %message.id,
                        "Message appended"
                    );
                    Ok(())
                }
                Err(error) => {
                    tracing::warn!(conversation = %conversation_id, %error, "Submit failed");
                    Err(error)
                }
            }
        })
    }

    /// Replace the view with `snapshot`.
    pub fn merge(&mut self, snapshot: Vec<Message>) {
        self.view = order_snapshot(snapshot);
    }

    pub fn messages(&self) -> &[Message] {
        &self.view
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.view.iter().find(|message| message.id == *id)
    }

    pub fn latest(&self) -> Option<&Message> {
        self.view.last()
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    /// Current view grouped by local calendar day.
    pub fn day_groups(&self) -> Vec<DayGroup> {
        group_by_day(&self.view)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Error;
    use crate::identity::{derive_conversation_id, ParticipantId};
    use crate::models::{Participant, ServerTime, Timestamp};
    use crate::store::InMemoryStore;

    fn signed_in(id: &str) -> Session {
        Session::signed_in(Participant::new(ParticipantId::new(id).unwrap(), id.to_uppercase()))
    }

    fn cache(store: &InMemoryStore) -> LocalMessageCache<InMemoryStore> {
        LocalMessageCache::new(
            Arc::new(store.clone()),
            derive_conversation_id("u1", "u2").unwrap(),
            "chats",
        )
    }

    fn message(body: &str, created_at: Timestamp) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: derive_conversation_id("u1", "u2").unwrap(),
            sender_id: ParticipantId::new("u2").unwrap(),
            sender_display_name: "U2".to_string(),
            body: body.to_string(),
            created_at,
            reaction: None,
        }
    }

    #[tokio::test]
    async fn blank_body_is_rejected_without_append() {
        let store = InMemoryStore::new();
        let cache = cache(&store);

        let err = cache.submit(&signed_in("u1"), "   ").err().unwrap();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyBody)));
        assert_eq!(store.append_count().await, 0);
    }

    #[tokio::test]
    async fn missing_sender_is_rejected_without_append() {
        let store = InMemoryStore::new();
        let cache = cache(&store);

        let err = cache.submit(&Session::new(), "hello").err().unwrap();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingSender)
        ));
        assert_eq!(store.append_count().await, 0);
    }

    #[tokio::test]
    async fn submit_does_not_touch_the_view() {
        let store = InMemoryStore::new();
        let cache = cache(&store);

        cache
            .submit(&signed_in("u1"), "  hello  ")
            .unwrap()
            .await
            .unwrap();
        assert!(cache.is_empty());

        let stored = store.snapshot("chats/u1_u2/messages").await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].body, "  hello  ");
        assert_eq!(stored[0].sender_display_name, "U1");
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let store = InMemoryStore::new();
        store.set_fail_writes(true).await;
        let cache = cache(&store);

        let err = cache
            .submit(&signed_in("u1"), "hello")
            .unwrap()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Write(_)));
    }

    #[test]
    fn merge_replaces_view_wholesale() {
        let store = InMemoryStore::new();
        let mut cache = cache(&store);

        cache.merge(vec![message("a", Timestamp::Resolved(ServerTime(1)))]);
        let replacement = vec![
            message("c", Timestamp::Pending { submitted_at_ms: 0 }),
            message("b", Timestamp::Resolved(ServerTime(2))),
        ];
        cache.merge(replacement);

        let bodies: Vec<_> = cache.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["b", "c"]);
        assert_eq!(cache.latest().map(|m| m.body.as_str()), Some("c"));
    }

    fn permutations(items: &[Message]) -> Vec<Vec<Message>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut all = Vec::new();
        for index in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(index);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                all.push(tail);
            }
        }
        all
    }

    fn relative_order<'a>(messages: &'a [Message], keep: &[&str]) -> Vec<&'a str> {
        messages
            .iter()
            .map(|m| m.body.as_str())
            .filter(|body| keep.contains(body))
            .collect()
    }

    #[test]
    fn merged_view_is_ordered_for_any_append_sequence() {
        let store = InMemoryStore::new();
        let mut cache = cache(&store);
        let records = vec![
            message("p1", Timestamp::Pending { submitted_at_ms: 5 }),
            message("r3", Timestamp::Resolved(ServerTime(3))),
            message("r1", Timestamp::Resolved(ServerTime(1))),
            message("p2", Timestamp::Pending { submitted_at_ms: 1 }),
            message("r3b", Timestamp::Resolved(ServerTime(3))),
        ];

        for arrival in permutations(&records) {
            cache.merge(arrival.clone());
            let view = cache.messages();

            assert_eq!(view.len(), arrival.len());
            for pair in view.windows(2) {
                assert_ne!(
                    pair[0].created_at.order_cmp(&pair[1].created_at),
                    std::cmp::Ordering::Greater
                );
            }
            assert_eq!(view[0].body, "r1");
            // Ties keep the order in which they arrived.
            assert_eq!(
                relative_order(view, &["r3", "r3b"]),
                relative_order(&arrival, &["r3", "r3b"])
            );
            assert_eq!(
                relative_order(view, &["p1", "p2"]),
                relative_order(&arrival, &["p1", "p2"])
            );
            assert!(view[3..].iter().all(Message::is_pending));
        }
    }

    #[test]
    fn get_finds_by_id() {
        let store = InMemoryStore::new();
        let mut cache = cache(&store);
        let target = message("x", Timestamp::Resolved(ServerTime(1)));
        let id = target.id;
        cache.merge(vec![target]);
        assert_eq!(cache.get(&id).map(|m| m.body.as_str()), Some("x"));
        assert!(cache.get(&MessageId::new()).is_none());
    }
}
