//! Chat client: one conversation on screen, driven from a single event queue.
//!
//! Snapshots from the live subscription, the typing deadline and session
//! changes are all consumed by [`ChatClient::next_update`], one at a time, so
//! state is only ever mutated sequentially.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

use crate::cache::{DayGroup, LocalMessageCache};
use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::identity::{ConversationId, ParticipantId};
use crate::models::{Conversation, Message, MessageId};
use crate::presence::PresenceTracker;
use crate::reactions::ReactionStore;
use crate::session::{AuthState, Session};
use crate::state::ConnectionState;
use crate::store::RemoteStore;
use crate::sync::{MessageStream, Snapshot, SubscriptionHandle};
use crate::unread::{UnreadTracker, ViewportMetrics};

/// What changed after processing one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientUpdate {
    /// A snapshot replaced the view
    ViewReplaced {
        messages: usize,
        unread: u32,
        /// The viewport is at the bottom and should scroll to the new tail
        follow_tail: bool,
    },
    /// The typing signal decayed
    TypingStopped,
    /// The open conversation was closed because the user signed out or
    /// changed
    ConversationClosed,
}

struct ActiveConversation<S: RemoteStore> {
    conversation: Conversation,
    handle: SubscriptionHandle,
    cache: LocalMessageCache<S>,
    reactions: ReactionStore<S>,
}

/// A signed-in user's chat screen: at most one open conversation and its derived state
pub struct ChatClient<S: RemoteStore> {
    store: Arc<S>,
    session: Session,
    session_changes: watch::Receiver<AuthState>,
    config: ChatConfig,
    stream: MessageStream<S>,
    active: Option<ActiveConversation<S>>,
    unread: UnreadTracker,
    presence: PresenceTracker,
    snapshots_tx: mpsc::UnboundedSender<Snapshot>,
    snapshots_rx: mpsc::UnboundedReceiver<Snapshot>,
}

impl<S: RemoteStore> ChatClient<S> {
    pub fn new(store: Arc<S>, session: Session, config: ChatConfig) -> Self {
        let stream = MessageStream::new(
            Arc::clone(&store),
            config.collection_root.clone(),
            config.backoff(),
        );
        let (snapshots_tx, snapshots_rx) = mpsc::unbounded_channel();
        Self {
            store,
            session_changes: session.changes(),
            session,
            unread: UnreadTracker::new(config.bottom_threshold_px),
            presence: PresenceTracker::new(config.typing_timeout()),
            config,
            stream,
            active: None,
            snapshots_tx,
            snapshots_rx,
        }
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Show the conversation with `peer`.
    ///
    /// The previous subscription is cancelled before the new one starts, and
    /// the view and unread counter start empty. Opening the conversation
    /// that is already open is a no-op.
    pub fn open_conversation(&mut self, peer: &ParticipantId) -> Result<ConversationId> {
        let me = self.session.require_user()?;
        let conversation = Conversation::between(me.id, peer.clone());

        if let Some(active) = &self.active {
            if active.conversation.id == conversation.id {
                return Ok(conversation.id);
            }
        }
        self.close_conversation();

        let id = conversation.id.clone();
        let root = self.config.collection_root.as_str();
        let cache = LocalMessageCache::new(Arc::clone(&self.store), id.clone(), root);
        let reactions = ReactionStore::new(Arc::clone(&self.store), id.clone(), root);

        let tx = self.snapshots_tx.clone();
        let handle = self.stream.subscribe(&id, move |snapshot| {
            let _ = tx.send(snapshot);
        });
        tracing::info!(conversation = %id, token = %handle.token(), "Opened conversation");

        self.unread = UnreadTracker::new(self.config.bottom_threshold_px);
        self.active = Some(ActiveConversation {
            conversation,
            handle,
            cache,
            reactions,
        });
        Ok(id)
    }

    /// Stop the live subscription and clear the view.
    pub fn close_conversation(&mut self) {
        if let Some(active) = self.active.take() {
            self.stream.unsubscribe(&active.handle);
            tracing::info!(conversation = %active.conversation.id, "Closed conversation");
        }
        self.unread.reached_bottom();
    }

    /// Wait for the next event and apply it.
    ///
    /// Snapshots from a subscription that is no longer current are dropped
    /// here without touching the view.
    pub async fn next_update(&mut self) -> Option<ClientUpdate> {
        loop {
            let deadline = self.presence.deadline();
            tokio::select! {
                received = self.snapshots_rx.recv() => {
                    if let Some(update) = self.apply_snapshot(received?) {
                        return Some(update);
                    }
                }
                Ok(()) = self.session_changes.changed() => {
                    if let Some(update) = self.apply_session_change() {
                        return Some(update);
                    }
                }
                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if self.presence.expire() {
                        return Some(ClientUpdate::TypingStopped);
                    }
                }
            }
        }
    }

    /// Apply every event that is already queued, without waiting.
    pub fn drain(&mut self) -> Vec<ClientUpdate> {
        let mut updates = Vec::new();
        if self.session_changes.has_changed().unwrap_or(false) {
            updates.extend(self.apply_session_change());
        }
        while let Ok(snapshot) = self.snapshots_rx.try_recv() {
            updates.extend(self.apply_snapshot(snapshot));
        }
        if self.presence.expire() {
            updates.push(ClientUpdate::TypingStopped);
        }
        updates
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) -> Option<ClientUpdate> {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(token = %snapshot.token, "Dropping snapshot with no open conversation");
            return None;
        };
        if snapshot.token != active.handle.token() {
            tracing::debug!(
                token = %snapshot.token,
                active = %active.handle.token(),
                "Dropping snapshot from inactive subscription"
            );
            return None;
        }

        active.cache.merge(snapshot.messages);
        let follow_tail = self.unread.on_snapshot();
        Some(ClientUpdate::ViewReplaced {
            messages: active.cache.len(),
            unread: self.unread.count(),
            follow_tail,
        })
    }

    fn apply_session_change(&mut self) -> Option<ClientUpdate> {
        let user = self.session_changes.borrow_and_update().user().cloned();
        let active = self.active.as_ref()?;
        let still_member = user
            .as_ref()
            .is_some_and(|user| active.conversation.peer_of(&user.id).is_some());
        if still_member {
            return None;
        }
        self.close_conversation();
        Some(ClientUpdate::ConversationClosed)
    }

    /// Validate and start appending a message to the open conversation.
    ///
    /// The returned write does not borrow the client: spawn it or poll it
    /// next to [`Self::next_update`] so snapshots and the typing deadline keep
    /// flowing while it is in flight.
    pub fn submit(
        &self,
        body: &str,
    ) -> Result<impl Future<Output = Result<()>> + Send + 'static> {
        let active = self.active.as_ref().ok_or(Error::NoActiveConversation)?;
        active.cache.submit(&self.session, body)
    }

    /// Validate and start overwriting a message's reaction. Same contract as
    /// [`Self::submit`].
    pub fn attach_reaction(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<impl Future<Output = Result<()>> + Send + 'static> {
        let active = self.active.as_ref().ok_or(Error::NoActiveConversation)?;
        active
            .reactions
            .attach_reaction(&self.session, message_id, emoji)
    }

    pub fn mark_typing(&mut self) {
        self.presence.mark_typing();
    }

    pub const fn is_typing(&self) -> bool {
        self.presence.is_typing()
    }

    pub fn on_viewport(&mut self, metrics: ViewportMetrics) {
        self.unread.on_viewport(metrics);
    }

    pub fn reached_bottom(&mut self) {
        self.unread.reached_bottom();
    }

    pub const fn unread_count(&self) -> u32 {
        self.unread.count()
    }

    pub fn messages(&self) -> &[Message] {
        self.active
            .as_ref()
            .map(|active| active.cache.messages())
            .unwrap_or_default()
    }

    pub fn day_groups(&self) -> Vec<DayGroup> {
        self.active
            .as_ref()
            .map(|active| active.cache.day_groups())
            .unwrap_or_default()
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active.as_ref().map(|active| &active.conversation)
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.active.as_ref().map(|active| active.handle.state())
    }
}

impl<S: RemoteStore> Drop for ChatClient<S> {
    fn drop(&mut self) {
        self.close_conversation();
    }
}
