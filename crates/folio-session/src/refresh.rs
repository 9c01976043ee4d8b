//! Single-flight token refresh.
//!
//! Any number of concurrent "please refresh" requests collapse into one call
//! to [`AuthGateway::refresh`]. Every caller receives a clone of the same
//! [`Shared`] future and therefore the same outcome.
//!
//! The refresh runs on its own task, so a caller that stops waiting (a torn
//! down view, a dropped request) never cancels it. There is no timeout beyond
//! the transport's: a hung refresh holds the slot until the transport gives up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::error::RefreshError;
use crate::gateway::AuthGateway;
use crate::navigation::Notice;
use crate::session::state::SessionEvent;
use crate::session::{Persist, SessionContext};
use crate::token::{self, TokenClaims, mask_token};

pub type RefreshResult = Result<TokenClaims, RefreshError>;

/// Handle on the in-flight refresh. Clones observe the same outcome.
pub type RefreshFuture = Shared<BoxFuture<'static, RefreshResult>>;

#[derive(Default)]
struct Slot {
    generation: u64,
    in_flight: Option<RefreshFuture>,
}

struct Inner {
    ctx: Arc<SessionContext>,
    gateway: Arc<dyn AuthGateway>,
    slot: Mutex<Slot>,
    calls: AtomicU64,
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(ctx: Arc<SessionContext>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self {
            inner: Arc::new(Inner {
                ctx,
                gateway,
                slot: Mutex::new(Slot::default()),
                calls: AtomicU64::new(0),
            }),
        }
    }

    /// Joins the in-flight refresh or starts one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn request_refresh(&self) -> RefreshFuture {
        let mut slot = self.inner.lock_slot();
        if let Some(in_flight) = &slot.in_flight {
            tracing::debug!("joining in-flight token refresh");
            return in_flight.clone();
        }

        slot.generation += 1;
        let generation = slot.generation;
        let token = self.inner.ctx.store().token();
        self.inner
            .ctx
            .commit(Persist::Keep, SessionEvent::RefreshStarted);
        tracing::info!(
            generation,
            token = %token.as_deref().map(mask_token).unwrap_or_default(),
            "starting token refresh"
        );

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run(generation, token).await });
        let shared = task
            .map(|joined| {
                joined.unwrap_or_else(|err| {
                    tracing::error!(error = %err, "token refresh task failed");
                    Err(RefreshError::Aborted)
                })
            })
            .boxed()
            .shared();

        slot.in_flight = Some(shared.clone());
        shared
    }

    /// True while a refresh is outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.inner.lock_slot().in_flight.is_some()
    }

    /// Number of refresh calls made to the gateway so far.
    pub fn gateway_calls(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(&self, generation: u64, token: Option<String>) -> RefreshResult {
        let outcome = match &token {
            Some(token) => self.call_gateway(token).await,
            None => Err(RefreshError::NoSession),
        };
        self.settle(generation, token.as_deref(), outcome)
    }

    async fn call_gateway(&self, token: &str) -> Result<(String, TokenClaims), RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let grant = self
            .gateway
            .refresh(token)
            .await
            .map_err(|err| RefreshError::from_gateway(err, self.ctx.config()))?;
        let claims = token::decode(&grant.access_token)?;
        Ok((grant.access_token, claims))
    }

    /// Clears the slot and commits the outcome while holding the slot lock,
    /// so a caller arriving now either sees the new token or starts a fresh
    /// refresh after this one is fully applied.
    ///
    /// The outcome only lands if the store still holds `started_from`; a
    /// logout or sign-out that happened meanwhile wins.
    fn settle(
        &self,
        generation: u64,
        started_from: Option<&str>,
        outcome: Result<(String, TokenClaims), RefreshError>,
    ) -> RefreshResult {
        let mut slot = self.lock_slot();
        if slot.generation == generation {
            slot.in_flight = None;
        }

        match outcome {
            Ok((token, claims)) => {
                let transition = self.ctx.commit_if_current(
                    started_from,
                    Persist::Save(&token),
                    SessionEvent::RefreshSucceeded {
                        token: token.clone(),
                        claims: claims.clone(),
                    },
                );
                let Some(transition) = transition else {
                    tracing::info!(generation, "session changed during refresh; discarding new token");
                    return Err(RefreshError::Superseded);
                };
                if !transition.persisted {
                    drop(slot);
                    self.ctx.force_login(transition, Notice::SessionExpired);
                    return Err(RefreshError::Storage);
                }
                tracing::info!(generation, "token refresh succeeded");
                Ok(claims)
            }
            Err(err) => {
                let notice = match err {
                    RefreshError::Invalid { .. } => Notice::SessionInvalid,
                    _ => Notice::SessionExpired,
                };
                let transition = self.ctx.commit_if_current(
                    started_from,
                    Persist::Clear,
                    SessionEvent::RefreshFailed {
                        message: notice.to_string(),
                    },
                );
                drop(slot);
                match transition {
                    Some(transition) => {
                        tracing::warn!(generation, error = %err, "token refresh failed; clearing session");
                        self.ctx.force_login(transition, notice);
                    }
                    None => {
                        tracing::debug!(generation, error = %err, "refresh failed after session changed; ignoring");
                    }
                }
                Err(err)
            }
        }
    }
}
