//! Session state and its transitions.
//!
//! `SessionState::reduce` is the only way state changes. Every transition is
//! total: success transitions set `token` and `identity` together, failure
//! and logout transitions clear both together.

use crate::token::{TokenClaims, UserIdentity};

/// Snapshot of the client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Current bearer token; mirrors durable storage.
    pub token: Option<String>,
    /// Derived from the token's claims.
    pub identity: Option<UserIdentity>,
    pub is_authenticated: bool,
    /// A login or refresh call is outstanding (or bootstrap has not run yet).
    pub is_loading: bool,
    /// Last user-facing failure.
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Inputs to [`SessionState::reduce`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Storage was read at startup. `None` means no usable token.
    Bootstrapped {
        session: Option<(String, TokenClaims)>,
    },
    LoginStarted,
    LoginSucceeded {
        token: String,
        claims: TokenClaims,
    },
    LoginFailed {
        message: String,
    },
    LoggedOut,
    RefreshStarted,
    RefreshSucceeded {
        token: String,
        claims: TokenClaims,
    },
    RefreshFailed {
        message: String,
    },
    /// The server reported the token as invalid or revoked.
    Revoked {
        message: String,
    },
    /// A token could not be written to durable storage.
    PersistFailed {
        message: String,
    },
}

impl SessionState {
    /// State at process start, before bootstrap.
    pub fn unknown() -> Self {
        Self {
            token: None,
            identity: None,
            is_authenticated: false,
            is_loading: true,
            error: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            is_loading: false,
            ..Self::unknown()
        }
    }

    fn authenticated(token: String, claims: TokenClaims) -> Self {
        Self {
            token: Some(token),
            identity: Some(claims.identity),
            is_authenticated: true,
            is_loading: false,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            error: Some(message),
            ..Self::anonymous()
        }
    }

    #[must_use]
    pub fn reduce(self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::Bootstrapped {
                session: Some((token, claims)),
            }
            | SessionEvent::LoginSucceeded { token, claims }
            | SessionEvent::RefreshSucceeded { token, claims } => {
                Self::authenticated(token, claims)
            }
            SessionEvent::Bootstrapped { session: None } | SessionEvent::LoggedOut => {
                Self::anonymous()
            }
            SessionEvent::LoginStarted | SessionEvent::RefreshStarted => Self {
                is_loading: true,
                ..self
            },
            SessionEvent::LoginFailed { message }
            | SessionEvent::RefreshFailed { message }
            | SessionEvent::Revoked { message }
            | SessionEvent::PersistFailed { message } => Self::failed(message),
        }
    }

    /// Display name of the signed-in user, or `""`.
    pub fn full_name(&self) -> &str {
        self.identity
            .as_ref()
            .map_or("", |identity| identity.display_name.as_str())
    }
}
