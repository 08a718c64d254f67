//! Single-slot message reactions.
//!
//! Each message has one reaction slot shared by both participants. Writes
//! overwrite it unconditionally; when both sides write at once the store's
//! commit order decides and the client never reconciles.

use std::future::Future;
use std::sync::Arc;

use crate::error::{Result, ValidationError};
use crate::identity::ConversationId;
use crate::models::MessageId;
use crate::session::Session;
use crate::store::RemoteStore;

/// Writes the shared reaction slot of messages in one conversation
pub struct ReactionStore<S: RemoteStore> {
    store: Arc<S>,
    conversation_id: ConversationId,
    path: String,
}

impl<S: RemoteStore> ReactionStore<S> {
    pub fn new(store: Arc<S>, conversation_id: ConversationId, collection_root: &str) -> Self {
        let path = conversation_id.messages_path(collection_root);
        Self {
            store,
            conversation_id,
            path,
        }
    }

    /// Overwrite the reaction of `message_id` with `emoji`.
    ///
    /// The user and the emoji are checked here; the returned future performs
    /// the write on its own. The new value becomes visible through the next
    /// snapshot.
    pub fn attach_reaction(
        &self,
        session: &Session,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<impl Future<Output = Result<()>> + Send + 'static> {
        let user = session.require_user()?;
        let emoji = emoji.trim().to_string();
        if emoji.is_empty() {
            return Err(ValidationError::EmptyReaction.into());
        }

        let store = Arc::clone(&self.store);
        let conversation_id = self.conversation_id.clone();
        let path = self.path.clone();
        let message_id = *message_id;

        Ok(async move {
            store
                .patch_reaction(&path, &message_id, &emoji)
                .await
                .inspect(|_| {
                    tracing::debug!(
                        conversation = %conversation_id,
                        message = %message_id,
                        user = %user.id,
                        emoji = %emoji,
                        "Reaction written"
                    );
                })
                .inspect_err(|error| {
                    tracing::warn!(
                        conversation = %conversation_id,
                        message = %message_id,
                        %error,
                        "Reaction write failed"
                    );
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::identity::{derive_conversation_id, ParticipantId};
    use crate::models::{MessageDraft, Participant};
    use crate::store::InMemoryStore;

    const PATH: &str = "chats/u1_u2/messages";

    fn session(id: &str) -> Session {
        Session::signed_in(Participant::new(ParticipantId::new(id).unwrap(), id))
    }

    async fn setup() -> (InMemoryStore, ReactionStore<InMemoryStore>, MessageId) {
        let store = InMemoryStore::new();
        let conversation_id = derive_conversation_id("u1", "u2").unwrap();
        let message = store
            .append(
                PATH,
                MessageDraft {
                    conversation_id: conversation_id.clone(),
                    sender_id: ParticipantId::new("u1").unwrap(),
                    sender_display_name: "u1".to_string(),
                    body: "hi".to_string(),
                    submitted_at_ms: 0,
                },
            )
            .await
            .unwrap();
        let reactions = ReactionStore::new(Arc::new(store.clone()), conversation_id, "chats");
        (store, reactions, message.id)
    }

    async fn reaction_of(store: &InMemoryStore, id: &MessageId) -> Option<String> {
        store
            .snapshot(PATH)
            .await
            .into_iter()
            .find(|m| m.id == *id)
            .and_then(|m| m.reaction)
    }

    #[tokio::test]
    async fn repeated_identical_reaction_is_idempotent() {
        let (store, reactions, id) = setup().await;
        reactions.attach_reaction(&session("u1"), &id, "❤️").unwrap().await.unwrap();
        reactions.attach_reaction(&session("u1"), &id, "❤️").unwrap().await.unwrap();
        assert_eq!(reaction_of(&store, &id).await.as_deref(), Some("❤️"));
    }

    #[tokio::test]
    async fn later_reaction_overwrites() {
        let (store, reactions, id) = setup().await;
        reactions.attach_reaction(&session("u1"), &id, "❤️").unwrap().await.unwrap();
        reactions.attach_reaction(&session("u2"), &id, "👍").unwrap().await.unwrap();
        assert_eq!(reaction_of(&store, &id).await.as_deref(), Some("👍"));
    }

    #[tokio::test]
    async fn signed_out_session_is_blocked() {
        let (store, reactions, id) = setup().await;
        let err = reactions
            .attach_reaction(&Session::new(), &id, "❤️")
            .err()
            .unwrap();
        assert!(matches!(err, Error::NotAuthenticated));
        assert_eq!(reaction_of(&store, &id).await, None);
    }

    #[tokio::test]
    async fn blank_reaction_is_rejected() {
        let (_store, reactions, id) = setup().await;
        let err = reactions
            .attach_reaction(&session("u1"), &id, "  ")
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmptyReaction)
        ));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_write_error() {
        let (store, reactions, id) = setup().await;
        store.set_fail_writes(true).await;
        let err = reactions
            .attach_reaction(&session("u1"), &id, "👍")
            .unwrap()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Write(_)));
    }
}
