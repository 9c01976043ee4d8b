//! Observable session store.
//!
//! Readers take snapshots or subscribe; only crate-internal writers (session
//! effects and the refresh coordinator) can apply events.

use tokio::sync::watch;

use super::state::{SessionEvent, SessionState};
use crate::token::UserIdentity;

/// Result of applying one event, as seen by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub was_authenticated: bool,
    pub is_authenticated: bool,
    /// False when durable storage could not be brought in line with the
    /// store for this transition.
    pub persisted: bool,
}

impl Transition {
    /// True when this event ended an authenticated session.
    pub fn signed_out(self) -> bool {
        self.was_authenticated && !self.is_authenticated
    }
}

#[derive(Debug)]
pub struct SessionStore {
    tx: watch::Sender<SessionState>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Creates a store in the "unknown" state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::unknown());
        Self { tx }
    }

    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Receives every state change. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token.clone()
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.tx.borrow().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.tx.borrow().error.clone()
    }

    pub fn full_name(&self) -> String {
        self.tx.borrow().full_name().to_string()
    }

    pub(crate) fn apply(&self, event: SessionEvent) -> Transition {
        let mut transition = Transition {
            was_authenticated: false,
            is_authenticated: false,
            persisted: true,
        };
        self.tx.send_modify(|state| {
            transition.was_authenticated = state.is_authenticated;
            *state = std::mem::take(state).reduce(event);
            transition.is_authenticated = state.is_authenticated;
        });
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_reports_sign_out_once() {
        let store = SessionStore::new();
        store.apply(SessionEvent::Bootstrapped {
            session: Some((
                "t".to_string(),
                crate::token::decode(&crate::token::encode_unsigned(
                    &crate::token::ClaimSet {
                        sub: "1".to_string(),
                        name: Some("Linus".to_string()),
                        ..Default::default()
                    },
                ))
                .unwrap(),
            )),
        });
        assert_eq!(store.full_name(), "Linus");

        let first = store.apply(SessionEvent::Revoked {
            message: "revoked".to_string(),
        });
        let second = store.apply(SessionEvent::Revoked {
            message: "revoked".to_string(),
        });

        assert!(first.signed_out());
        assert!(!second.signed_out());
        assert!(store.token().is_none());
        assert_eq!(store.error().as_deref(), Some("revoked"));
    }

    #[tokio::test]
    async fn test_subscribers_observe_changes() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_loading);

        store.apply(SessionEvent::Bootstrapped { session: None });
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_loading);

        drop(rx);
        store.apply(SessionEvent::LoggedOut);
        assert!(!store.is_loading());
    }
}
