//! Session context, state and effects.
//!
//! ```text
//! SessionContext
//! ├── store: SessionStore          (observable state, crate-private writes)
//! ├── storage: dyn SessionStorage  (durable token slot)
//! ├── navigator: dyn Navigator     (host navigation + notices)
//! └── config: SessionConfig        (rejection codes)
//! ```
//!
//! Writers go through [`SessionContext::commit`], which writes storage before
//! the store transition becomes observable.

pub mod effects;
pub mod state;
pub mod store;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::SessionConfig;
use crate::navigation::{Navigator, Notice, Route};
use crate::storage::SessionStorage;
use state::SessionEvent;
use store::{SessionStore, Transition};

/// Shown when a token could not be written to durable storage.
pub(crate) const PERSIST_FAILED: &str = "Your session could not be saved. Please log in again.";

/// Storage side of a commit.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Persist<'a> {
    Save(&'a str),
    Clear,
    Keep,
}

/// Explicitly constructed session context, shared by `Arc`.
pub struct SessionContext {
    store: SessionStore,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    /// Serializes commits so storage and store change in the same order.
    commit_lock: Mutex<()>,
}

impl SessionContext {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store: SessionStore::new(),
            storage,
            navigator,
            config,
            commit_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Persists, then applies `event`.
    ///
    /// If a token cannot be saved the session ends instead: storage is
    /// cleared and [`SessionEvent::PersistFailed`] is applied in place of
    /// `event`. A clear that still fails after one retry is logged and
    /// reported through [`Transition::persisted`].
    pub(crate) fn commit(&self, persist: Persist<'_>, event: SessionEvent) -> Transition {
        let _guard = self.lock_commits();
        self.commit_locked(persist, event)
    }

    /// Like [`commit`](Self::commit), but only while the store still holds
    /// `expected`. Returns `None` when the session has moved on (logout,
    /// sign-out, a newer token) and nothing was written.
    pub(crate) fn commit_if_current(
        &self,
        expected: Option<&str>,
        persist: Persist<'_>,
        event: SessionEvent,
    ) -> Option<Transition> {
        let _guard = self.lock_commits();
        if self.store.token().as_deref() != expected {
            return None;
        }
        Some(self.commit_locked(persist, event))
    }

    fn lock_commits(&self) -> MutexGuard<'_, ()> {
        self.commit_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit_locked(&self, persist: Persist<'_>, event: SessionEvent) -> Transition {
        match persist {
            Persist::Keep => self.store.apply(event),
            Persist::Save(token) => match self.storage.save(token) {
                Ok(()) => self.store.apply(event),
                Err(err) => {
                    tracing::error!(error = %format!("{err:#}"), "failed to save session token; ending session");
                    self.clear_storage();
                    let mut transition = self.store.apply(SessionEvent::PersistFailed {
                        message: PERSIST_FAILED.to_string(),
                    });
                    transition.persisted = false;
                    transition
                }
            },
            Persist::Clear => {
                let cleared = self.clear_storage();
                let mut transition = self.store.apply(event);
                transition.persisted = cleared;
                transition
            }
        }
    }

    fn clear_storage(&self) -> bool {
        let Err(first) = self.storage.clear() else {
            return true;
        };
        tracing::warn!(error = %format!("{first:#}"), "failed to clear session token; retrying");
        match self.storage.clear() {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "session token left in storage");
                false
            }
        }
    }

    /// Sends the user to login after an unrecoverable failure.
    ///
    /// Only the transition that actually ended the session navigates, so N
    /// concurrent failures produce one redirect and one notice.
    pub(crate) fn force_login(&self, transition: Transition, notice: Notice) {
        if transition.signed_out() {
            tracing::info!(%notice, "session ended; redirecting to login");
            self.navigator.notify(notice);
            self.navigator.navigate(&Route::Login);
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
