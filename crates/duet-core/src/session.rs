//! Explicit session context fed by the identity provider.
//!
//! Components receive a [`Session`] instead of reaching for a global, so each
//! one can be driven in isolation.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::models::Participant;

/// Authentication state reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Loading,
    SignedOut,
    SignedIn(Participant),
}

impl AuthState {
    #[must_use]
    pub const fn user(&self) -> Option<&Participant> {
        match self {
            Self::SignedIn(user) => Some(user),
            Self::Loading | Self::SignedOut => None,
        }
    }
}

/// Shared handle to the current authentication state.
///
/// Clones observe the same state. The identity provider pushes changes with
/// [`Session::set_state`].
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<watch::Sender<AuthState>>,
}

impl Session {
    /// A session that is still waiting for the identity provider.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            state: Arc::new(state),
        }
    }

    /// A session already signed in as `user`.
    #[must_use]
    pub fn signed_in(user: Participant) -> Self {
        let session = Self::new();
        session.set_state(AuthState::SignedIn(user));
        session
    }

    pub fn set_state(&self, next: AuthState) {
        match &next {
            AuthState::SignedIn(user) => tracing::info!(user = %user.id, "Session signed in"),
            AuthState::SignedOut => tracing::info!("Session signed out"),
            AuthState::Loading => tracing::debug!("Session loading"),
        }
        self.state.send_replace(next);
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<Participant> {
        self.state.borrow().user().cloned()
    }

    /// The signed-in user, or `NotAuthenticated` while loading or signed out.
    pub fn require_user(&self) -> Result<Participant> {
        self.current_user().ok_or(Error::NotAuthenticated)
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory entries other than the signed-in user.
///
/// Returns an empty list while nobody is signed in.
#[must_use]
pub fn others(directory: &[Participant], session: &Session) -> Vec<Participant> {
    let Some(me) = session.current_user() else {
        return Vec::new();
    };
    directory
        .iter()
        .filter(|participant| participant.id != me.id)
        .cloned()
        .collect()
}
