//! Middleware for every outbound protected call.
//!
//! ```text
//! attach ─▶ dispatch ─┬─ success / other status ─────────────▶ pass through
//!                     ├─ expired ─▶ refresh ─┬─ ok ─▶ retry once ─▶ result
//!                     │                      └─ failed ─────────▶ RefreshFailure
//!                     └─ invalid ─▶ clear session ──────────────▶ InvalidSession
//! ```
//!
//! The interceptor never writes session state itself: clearing goes through
//! [`SessionEffects`], refreshing through the shared coordinator.

use std::sync::Arc;

use crate::config::{ApiConfig, RejectionKind, SessionConfig};
use crate::error::SessionError;
use crate::session::effects::SessionEffects;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// How a response relates to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Hand the response to the caller unchanged.
    Pass,
    /// Token expired; refresh and retry.
    Expired,
    /// Token invalid or revoked; end the session.
    Invalid,
}

/// Maps a raw response onto a [`Disposition`] using the configured codes.
pub fn classify(response: &ApiResponse, codes: &SessionConfig) -> Disposition {
    if response.is_success() {
        return Disposition::Pass;
    }
    match response.error_code().as_deref().and_then(|c| codes.classify(c)) {
        Some(RejectionKind::Expired) => Disposition::Expired,
        Some(RejectionKind::Invalid) => Disposition::Invalid,
        None => Disposition::Pass,
    }
}

pub struct RequestInterceptor {
    effects: Arc<SessionEffects>,
    transport: Arc<dyn Transport>,
    api: ApiConfig,
}

impl RequestInterceptor {
    pub fn new(effects: Arc<SessionEffects>, transport: Arc<dyn Transport>, api: ApiConfig) -> Self {
        Self {
            effects,
            transport,
            api,
        }
    }

    /// Sends `request` with the session token, refreshing once on expiry.
    ///
    /// Non-success responses that carry no session signal are returned as
    /// `Ok` so callers can handle them. `request` is never modified.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        if self.api.is_token_endpoint(&request.path) {
            return Ok(self.transport.send(request).await?);
        }

        let ctx = self.effects.context();
        let sent = ctx.store().token();
        let response = self.dispatch(request, sent.as_deref()).await?;

        match classify(&response, ctx.config()) {
            Disposition::Pass => Ok(response),
            // The refused token is already being replaced; retry with its successor.
            Disposition::Invalid if self.superseded(sent.as_deref()) => {
                tracing::debug!(path = %request.path, "invalid rejection for a replaced token");
                self.recover(request, sent).await
            }
            Disposition::Invalid => {
                tracing::warn!(path = %request.path, status = response.status, "session rejected as invalid");
                self.effects.invalidate(sent.as_deref());
                Err(SessionError::InvalidSession {
                    status: response.status,
                })
            }
            Disposition::Expired => self.recover(request, sent).await,
        }
    }

    /// True if `sent` is no longer the session token, or is about to stop
    /// being it.
    fn superseded(&self, sent: Option<&str>) -> bool {
        let current = self.effects.context().store().token();
        self.effects.refresher().is_refreshing()
            || (current.is_some() && current.as_deref() != sent)
    }

    async fn recover(
        &self,
        request: &ApiRequest,
        sent: Option<String>,
    ) -> Result<ApiResponse, SessionError> {
        let ctx = self.effects.context();

        // Another caller may already have rotated the token since this one
        // was sent; retry with it directly instead of refreshing again.
        let current = ctx.store().token();
        if current.is_some() && current != sent && !self.effects.refresher().is_refreshing() {
            tracing::debug!(path = %request.path, "token rotated while call was in flight");
        } else {
            tracing::debug!(path = %request.path, "session expired; awaiting refresh");
            self.effects
                .refresher()
                .request_refresh()
                .await
                .map_err(SessionError::RefreshFailure)?;
        }

        // Read the token written by the refresh, not the one we started with.
        let token = ctx.store().token();
        let retried = self.dispatch(request, token.as_deref()).await?;

        match classify(&retried, ctx.config()) {
            Disposition::Pass => Ok(retried),
            Disposition::Expired => {
                tracing::warn!(path = %request.path, "rejected again after refresh; giving up");
                Err(SessionError::ExpiredSession {
                    status: retried.status,
                })
            }
            Disposition::Invalid => {
                self.effects.invalidate(token.as_deref());
                Err(SessionError::InvalidSession {
                    status: retried.status,
                })
            }
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, SessionError> {
        let response = match token {
            Some(token) => self.transport.send(&request.authorized(token)).await?,
            None => self.transport.send(request).await?,
        };
        Ok(response)
    }
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestInterceptor")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}
