//! Snapshot subscription scoped to one conversation.
//!
//! Each subscription runs as a tokio task that connects to the store,
//! forwards every full snapshot to the caller, and reconnects with backoff
//! when the feed drops. A single delivery gate decides which subscription is
//! current: deliveries carry the token of the subscription that produced
//! them and are dropped once that token is no longer the active one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::AbortHandle;

use super::backoff::BackoffPolicy;
use crate::identity::ConversationId;
use crate::models::{order_snapshot, Message};
use crate::state::ConnectionState;
use crate::store::RemoteStore;

/// Monotonically assigned id of one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionToken(u64);

impl SubscriptionToken {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Complete ordered message set of a conversation at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub token: SubscriptionToken,
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
}

/// Handle returned by [`MessageStream::subscribe`]
#[derive(Debug)]
pub struct SubscriptionHandle {
    token: SubscriptionToken,
    conversation_id: ConversationId,
    state: Arc<watch::Sender<ConnectionState>>,
    task: AbortHandle,
}

impl SubscriptionHandle {
    #[must_use]
    pub const fn token(&self) -> SubscriptionToken {
        self.token
    }

    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

struct ActiveSubscription {
    token: SubscriptionToken,
    state: Arc<watch::Sender<ConnectionState>>,
    task: Option<AbortHandle>,
}

impl ActiveSubscription {
    fn close(self) {
        if let Some(task) = self.task {
            task.abort();
        }
        self.state.send_replace(ConnectionState::Closed);
    }
}

/// Decides which subscription may deliver. The lock is held for the whole
/// callback, so a cleared token can never see another invocation.
#[derive(Default)]
struct DeliveryGate {
    active: Mutex<Option<ActiveSubscription>>,
}

impl DeliveryGate {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ActiveSubscription>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `token` current and return whatever it replaced.
    fn activate(
        &self,
        token: SubscriptionToken,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Option<ActiveSubscription> {
        self.lock().replace(ActiveSubscription {
            token,
            state,
            task: None,
        })
    }

    fn attach_task(&self, token: SubscriptionToken, task: AbortHandle) {
        let mut active = self.lock();
        match active.as_mut() {
            Some(current) if current.token == token => current.task = Some(task),
            _ => task.abort(),
        }
    }

    /// Clear `token` if it is current. Returns false when it already was not.
    fn deactivate(&self, token: SubscriptionToken) -> bool {
        let mut active = self.lock();
        if active.as_ref().is_some_and(|current| current.token == token) {
            *active = None;
            true
        } else {
            false
        }
    }

    fn active_token(&self) -> Option<SubscriptionToken> {
        self.lock().as_ref().map(|current| current.token)
    }

    /// Run `deliver` only if `token` is current.
    fn deliver(&self, token: SubscriptionToken, deliver: impl FnOnce()) -> bool {
        let active = self.lock();
        if active.as_ref().is_some_and(|current| current.token == token) {
            deliver();
            true
        } else {
            false
        }
    }
}

/// Manages the live subscription of the conversation on screen.
///
/// At most one subscription is current. Subscribing again cuts the previous
/// one over first, so a stale conversation can never write into the view of
/// the new one.
pub struct MessageStream<S: RemoteStore> {
    store: Arc<S>,
    collection_root: String,
    backoff: BackoffPolicy,
    next_token: AtomicU64,
    gate: Arc<DeliveryGate>,
}

impl<S: RemoteStore> MessageStream<S> {
    pub fn new(store: Arc<S>, collection_root: impl Into<String>, backoff: BackoffPolicy) -> Self {
        Self {
            store,
            collection_root: collection_root.into(),
            backoff,
            next_token: AtomicU64::new(1),
            gate: Arc::new(DeliveryGate::default()),
        }
    }

    /// Start a live subscription on `conversation_id`.
    ///
    /// `on_snapshot` receives the full ordered message set after every
    /// change and again after each reconnect. It runs while the delivery gate
    /// is held, so it must not call back into this stream.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, conversation_id: &ConversationId, on_snapshot: F) -> SubscriptionHandle
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let state = Arc::new(state);

        if let Some(previous) = self.gate.activate(token, Arc::clone(&state)) {
            tracing::info!(
                previous = %previous.token,
                next = %token,
                "Cutting over from previous subscription"
            );
            previous.close();
        }
        let path = conversation_id.messages_path(&self.collection_root);
        tracing::info!(conversation = %conversation_id, token = %token, path = %path, "Subscribing");

        let worker = SubscriptionWorker {
            store: Arc::clone(&self.store),
            gate: Arc::clone(&self.gate),
            backoff: self.backoff,
            state: Arc::clone(&state),
            conversation_id: conversation_id.clone(),
            path,
            token,
        };
        let join = tokio::spawn(worker.run(on_snapshot));
        self.gate.attach_task(token, join.abort_handle());
        let task = join.abort_handle();

        SubscriptionHandle {
            token,
            conversation_id: conversation_id.clone(),
            state,
            task,
        }
    }

    /// Stop `handle`'s subscription. Idempotent.
    ///
    /// Once this returns, the callback of `handle` is never invoked again,
    /// including for snapshots that were already in flight.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if self.gate.deactivate(handle.token) {
            tracing::info!(
                conversation = %handle.conversation_id,
                token = %handle.token,
                "Unsubscribed"
            );
        }
        handle.task.abort();
        handle.state.send_replace(ConnectionState::Closed);
    }

    /// Token of the current subscription, if any.
    pub fn active_token(&self) -> Option<SubscriptionToken> {
        self.gate.active_token()
    }

    pub fn is_active(&self, handle: &SubscriptionHandle) -> bool {
        self.active_token() == Some(handle.token)
    }
}

impl<S: RemoteStore> Drop for MessageStream<S> {
    fn drop(&mut self) {
        if let Some(active) = self.gate.lock().take() {
            active.close();
        }
    }
}

struct SubscriptionWorker<S: RemoteStore> {
    store: Arc<S>,
    gate: Arc<DeliveryGate>,
    backoff: BackoffPolicy,
    state: Arc<watch::Sender<ConnectionState>>,
    conversation_id: ConversationId,
    path: String,
    token: SubscriptionToken,
}

impl<S: RemoteStore> SubscriptionWorker<S> {
    /// Report `next` on the handle, unless this subscription was cut over or
    /// closed in the meantime.
    fn publish_state(&self, next: ConnectionState) {
        self.gate.deliver(self.token, || {
            self.state.send_replace(next);
        });
    }

    async fn run<F>(self, mut on_snapshot: F)
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let mut attempt = 0u32;

        while self.gate.active_token() == Some(self.token) {
            match self.store.subscribe(&self.path).await {
                Ok(mut feed) => {
                    attempt = 0;
                    self.publish_state(ConnectionState::Live);
                    tracing::debug!(token = %self.token, "Snapshot feed connected");

                    while let Some(messages) = feed.recv().await {
                        let snapshot = Snapshot {
                            token: self.token,
                            conversation_id: self.conversation_id.clone(),
                            messages: order_snapshot(messages),
                        };
                        let count = snapshot.messages.len();
                        if !self.gate.deliver(self.token, || on_snapshot(snapshot)) {
                            tracing::debug!(token = %self.token, "Discarded stale snapshot");
                            return;
                        }
                        tracing::debug!(token = %self.token, messages = count, "Delivered snapshot");
                    }

                    tracing::warn!(
                        conversation = %self.conversation_id,
                        token = %self.token,
                        "Snapshot feed interrupted"
                    );
                }
                Err(error) => {
                    tracing::warn!(
                        conversation = %self.conversation_id,
                        token = %self.token,
                        %error,
                        "Subscribe failed"
                    );
                }
            }

            attempt = attempt.saturating_add(1);
            let delay = self.backoff.delay_for(attempt);
            self.publish_state(ConnectionState::Reconnecting { attempt });
            tracing::info!(
                token = %self.token,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
