//! Wiring of the session components into one handle.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::gateway::{AuthGateway, HttpAuthGateway};
use crate::guards::{self, GuardDecision};
use crate::interceptor::RequestInterceptor;
use crate::navigation::{Navigator, Route};
use crate::session::SessionContext;
use crate::session::effects::SessionEffects;
use crate::storage::{FileSessionStorage, SessionStorage};
use crate::transport::{HttpTransport, Transport};

/// Session context, effects and interceptor built over shared collaborators.
#[derive(Debug, Clone)]
pub struct SessionClient {
    effects: Arc<SessionEffects>,
    interceptor: Arc<RequestInterceptor>,
}

impl SessionClient {
    pub fn new(
        config: &Config,
        storage: Arc<dyn SessionStorage>,
        navigator: Arc<dyn Navigator>,
        gateway: Arc<dyn AuthGateway>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let ctx = Arc::new(SessionContext::new(
            storage,
            navigator,
            config.session.clone(),
        ));
        let effects = Arc::new(SessionEffects::new(ctx, gateway));
        let interceptor = Arc::new(RequestInterceptor::new(
            Arc::clone(&effects),
            transport,
            config.api.clone(),
        ));
        Self {
            effects,
            interceptor,
        }
    }

    /// HTTP gateway and transport, token file under FOLIO_HOME.
    pub fn from_config(config: &Config, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.api.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::new(
            config,
            Arc::new(FileSessionStorage::from_config(config)),
            navigator,
            Arc::new(HttpAuthGateway::new(http.clone(), config.api.clone())),
            Arc::new(HttpTransport::new(http, config.api.clone())),
        ))
    }

    pub fn effects(&self) -> &Arc<SessionEffects> {
        &self.effects
    }

    pub fn interceptor(&self) -> &Arc<RequestInterceptor> {
        &self.interceptor
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        self.effects.context()
    }

    /// Runs the guard for `route`, navigating on redirect.
    pub fn enter(&self, route: &Route) -> GuardDecision {
        let ctx = self.context();
        let decision = guards::check_route(route, ctx.storage());
        if let GuardDecision::Redirect(target) = &decision {
            ctx.navigator().navigate(target);
        }
        decision
    }
}
