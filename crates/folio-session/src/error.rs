//! Session error taxonomy.
//!
//! Raw gateway and transport failures are classified into these variants at
//! the boundary. Only `InvalidSession` and `RefreshFailure` ever change
//! session state.

use crate::config::{RejectionKind, SessionConfig};
use crate::gateway::GatewayError;
use crate::token::DecodeError;
use crate::transport::TransportError;

/// Outcome of a protected call that did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The stored or issued token could not be parsed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Rejected as expired after the one permitted refresh-and-retry.
    #[error("session expired (HTTP {status})")]
    ExpiredSession { status: u16 },
    /// Rejected as tampered or revoked. The session has been cleared.
    #[error("session is no longer valid (HTTP {status})")]
    InvalidSession { status: u16 },
    /// The refresh itself failed. The session has been cleared.
    #[error("token refresh failed: {0}")]
    RefreshFailure(#[from] RefreshError),
    /// Transport failure; session state untouched.
    #[error(transparent)]
    Network(#[from] TransportError),
}

impl SessionError {
    /// True for the kinds that end the session.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidSession { .. } | SessionError::RefreshFailure(_)
        )
    }
}

/// Why a refresh failed. Shared by every caller waiting on that refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("no session to refresh")]
    NoSession,
    #[error("refresh window has passed: {message}")]
    Expired { message: String },
    #[error("token was rejected as invalid: {message}")]
    Invalid { message: String },
    #[error("refresh rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("refresh request failed: {0}")]
    Transport(String),
    #[error("issuer returned an unreadable token: {0}")]
    Decode(#[from] DecodeError),
    #[error("refresh task aborted")]
    Aborted,
    /// The session changed (logout, sign-out, new login) while the refresh
    /// was running; its outcome was discarded.
    #[error("session changed during refresh")]
    Superseded,
    #[error("refreshed token could not be saved")]
    Storage,
}

impl RefreshError {
    pub(crate) fn from_gateway(err: GatewayError, codes: &SessionConfig) -> Self {
        match err {
            GatewayError::Rejected {
                status,
                code,
                message,
            } => match code.as_deref().and_then(|c| codes.classify(c)) {
                Some(RejectionKind::Expired) => RefreshError::Expired { message },
                Some(RejectionKind::Invalid) => RefreshError::Invalid { message },
                None => RefreshError::Rejected { status, message },
            },
            GatewayError::Transport(message) | GatewayError::InvalidResponse(message) => {
                RefreshError::Transport(message)
            }
        }
    }
}

/// Why a login attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("the issued token could not be saved")]
    Storage,
}

impl LoginError {
    /// Message suitable for showing next to the login form.
    pub fn user_message(&self) -> String {
        match self {
            LoginError::Gateway(GatewayError::Rejected { message, .. }) if !message.is_empty() => {
                message.clone()
            }
            LoginError::Gateway(GatewayError::Rejected { .. }) => {
                "Invalid email or password.".to_string()
            }
            LoginError::Gateway(GatewayError::Transport(_)) => {
                "Unable to reach the server. Please try again.".to_string()
            }
            LoginError::Gateway(GatewayError::InvalidResponse(_)) | LoginError::Decode(_) => {
                "The server returned an unexpected response.".to_string()
            }
            LoginError::Storage => crate::session::PERSIST_FAILED.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(code: Option<&str>) -> GatewayError {
        GatewayError::Rejected {
            status: 401,
            code: code.map(str::to_string),
            message: "nope".to_string(),
        }
    }

    #[test]
    fn test_refresh_error_classification() {
        let codes = SessionConfig::default();

        assert!(matches!(
            RefreshError::from_gateway(rejected(Some("token_expired")), &codes),
            RefreshError::Expired { .. }
        ));
        assert!(matches!(
            RefreshError::from_gateway(rejected(Some("token_blacklisted")), &codes),
            RefreshError::Invalid { .. }
        ));
        assert_eq!(
            RefreshError::from_gateway(rejected(None), &codes),
            RefreshError::Rejected {
                status: 401,
                message: "nope".to_string()
            }
        );
        assert_eq!(
            RefreshError::from_gateway(GatewayError::Transport("reset".to_string()), &codes),
            RefreshError::Transport("reset".to_string())
        );
    }

    #[test]
    fn test_unrecoverable_kinds() {
        assert!(SessionError::InvalidSession { status: 401 }.is_unrecoverable());
        assert!(SessionError::RefreshFailure(RefreshError::NoSession).is_unrecoverable());
        assert!(!SessionError::ExpiredSession { status: 401 }.is_unrecoverable());
        assert!(!SessionError::Network(TransportError::new("down")).is_unrecoverable());
    }

    #[test]
    fn test_login_user_message() {
        let err = LoginError::Gateway(GatewayError::Rejected {
            status: 401,
            code: None,
            message: String::new(),
        });
        assert_eq!(err.user_message(), "Invalid email or password.");

        let err = LoginError::Gateway(GatewayError::Transport("refused".to_string()));
        assert!(err.user_message().contains("Unable to reach"));
    }
}
