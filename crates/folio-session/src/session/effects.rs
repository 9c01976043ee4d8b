//! Side-effecting session verbs: bootstrap, login, logout, refresh.
//!
//! Together with the refresh coordinator this is the only writer of the
//! session store and durable storage.

use std::sync::Arc;

use super::state::SessionEvent;
use super::{Persist, SessionContext};
use crate::error::{LoginError, SessionError};
use crate::gateway::{AuthGateway, Credentials};
use crate::navigation::{Notice, Route};
use crate::refresh::RefreshCoordinator;
use crate::token::{self, DecodeError, TokenClaims, UserIdentity};

/// What bootstrap found in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Anonymous,
    /// A syntactically valid token was restored without a network call.
    Restored(UserIdentity),
    /// The stored token could not be decoded and was cleared.
    Discarded(DecodeError),
}

pub struct SessionEffects {
    ctx: Arc<SessionContext>,
    gateway: Arc<dyn AuthGateway>,
    refresher: RefreshCoordinator,
}

impl SessionEffects {
    pub fn new(ctx: Arc<SessionContext>, gateway: Arc<dyn AuthGateway>) -> Self {
        let refresher = RefreshCoordinator::new(Arc::clone(&ctx), Arc::clone(&gateway));
        Self {
            ctx,
            gateway,
            refresher,
        }
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// Restores the session from durable storage.
    ///
    /// A decodable token is trusted as-is (no network call); the server
    /// rejects it on first use if it has actually expired or been revoked.
    pub fn bootstrap(&self) -> BootstrapOutcome {
        let stored = match self.ctx.storage().load() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "session storage unreadable; starting anonymous");
                self.ctx
                    .commit(Persist::Clear, SessionEvent::Bootstrapped { session: None });
                return BootstrapOutcome::Anonymous;
            }
        };

        let Some(stored) = stored else {
            self.ctx
                .commit(Persist::Keep, SessionEvent::Bootstrapped { session: None });
            return BootstrapOutcome::Anonymous;
        };

        match token::decode(&stored) {
            Ok(claims) => {
                let identity = claims.identity.clone();
                tracing::debug!(user = %identity.id, "restored session from storage");
                self.ctx.commit(
                    Persist::Keep,
                    SessionEvent::Bootstrapped {
                        session: Some((stored, claims)),
                    },
                );
                BootstrapOutcome::Restored(identity)
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding undecodable stored token");
                self.ctx
                    .commit(Persist::Clear, SessionEvent::Bootstrapped { session: None });
                BootstrapOutcome::Discarded(err)
            }
        }
    }

    /// Authenticates and navigates to the dashboard on success.
    ///
    /// On failure storage is left alone and the session stays anonymous.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserIdentity, LoginError> {
        self.ctx.commit(Persist::Keep, SessionEvent::LoginStarted);

        match self.authenticate(credentials).await {
            Ok((token, claims)) => {
                let identity = claims.identity.clone();
                let transition = self.ctx.commit(
                    Persist::Save(&token),
                    SessionEvent::LoginSucceeded { token: token.clone(), claims },
                );
                if !transition.persisted {
                    return Err(LoginError::Storage);
                }
                tracing::info!(user = %identity.id, "login succeeded");
                self.ctx.navigator().navigate(&Route::Dashboard);
                Ok(identity)
            }
            Err(err) => {
                tracing::warn!(error = %err, "login failed");
                // A failed login ends any previous session; keep storage in step.
                let persist = if self.ctx.store().token().is_some() {
                    Persist::Clear
                } else {
                    Persist::Keep
                };
                self.ctx.commit(
                    persist,
                    SessionEvent::LoginFailed {
                        message: err.user_message(),
                    },
                );
                Err(err)
            }
        }
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<(String, TokenClaims), LoginError> {
        let grant = self.gateway.login(credentials).await?;
        let claims = token::decode(&grant.access_token)?;
        Ok((grant.access_token, claims))
    }

    /// Ends the session. Always succeeds locally.
    pub async fn logout(&self) {
        if let Some(token) = self.ctx.store().token() {
            if let Err(err) = self.gateway.logout(&token).await {
                tracing::debug!(error = %err, "remote logout failed; ignoring");
            }
        }
        self.ctx.commit(Persist::Clear, SessionEvent::LoggedOut);
        tracing::info!("logged out");
        self.ctx.navigator().navigate(&Route::Login);
    }

    /// Explicit refresh (idle timer, user action). Shares the in-flight
    /// refresh with the interceptor.
    pub async fn refresh_token(&self) -> Result<TokenClaims, SessionError> {
        self.refresher
            .request_refresh()
            .await
            .map_err(SessionError::RefreshFailure)
    }

    /// Clears a session the server reported as invalid or revoked.
    ///
    /// `rejected` is the token the server refused. Nothing happens if the
    /// session has already moved past it.
    pub(crate) fn invalidate(&self, rejected: Option<&str>) {
        let transition = self.ctx.commit_if_current(
            rejected,
            Persist::Clear,
            SessionEvent::Revoked {
                message: Notice::SessionInvalid.to_string(),
            },
        );
        match transition {
            Some(transition) => self.ctx.force_login(transition, Notice::SessionInvalid),
            None => tracing::debug!("invalid rejection for a replaced token; ignoring"),
        }
    }
}

impl std::fmt::Debug for SessionEffects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEffects")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
