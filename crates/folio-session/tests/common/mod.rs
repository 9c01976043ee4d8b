//! Fakes shared by the session integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use folio_session::SessionClient;
use folio_session::config::Config;
use folio_session::gateway::{AuthGateway, Credentials, GatewayError, TokenGrant};
use folio_session::navigation::{Navigator, RecordingNavigator};
use folio_session::storage::{MemorySessionStorage, SessionStorage};
use folio_session::token::{AccountType, ClaimSet, Company, encode_unsigned};
use folio_session::transport::{ApiRequest, ApiResponse, Transport, TransportError};

pub fn claims(name: &str) -> ClaimSet {
    ClaimSet {
        sub: "17".to_string(),
        name: Some(name.to_string()),
        email: Some("owner@example.com".to_string()),
        account_type: Some(AccountType::Client),
        email_verified_at: None,
        companies: Some(vec![Company {
            id: "3".to_string(),
            name: "Acme".to_string(),
        }]),
        iat: Some(Utc::now().timestamp()),
        exp: Some(Utc::now().timestamp() + 3600),
    }
}

/// Token for `name` that expires `exp_offset` seconds from now.
pub fn token(name: &str, exp_offset: i64) -> String {
    encode_unsigned(&ClaimSet {
        exp: Some(Utc::now().timestamp() + exp_offset),
        ..claims(name)
    })
}

pub fn rejection(code: &str) -> GatewayError {
    GatewayError::Rejected {
        status: 401,
        code: Some(code.to_string()),
        message: format!("rejected: {code}"),
    }
}

pub fn expired_response() -> ApiResponse {
    ApiResponse::new(401, r#"{"code":"token_expired","message":"Token has expired"}"#)
}

pub fn invalid_response() -> ApiResponse {
    ApiResponse::new(401, r#"{"code":"token_invalid","message":"Token is invalid"}"#)
}

/// Scripted [`AuthGateway`] that counts calls.
pub struct FakeGateway {
    pub login_result: Mutex<Result<String, GatewayError>>,
    pub refresh_result: Mutex<Result<String, GatewayError>>,
    pub logout_fails: bool,
    pub refresh_delay: Duration,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub refreshed_with: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            login_result: Mutex::new(Ok(token("Ada Lovelace", 3600))),
            refresh_result: Mutex::new(Ok(token("Ada Lovelace", 7200))),
            logout_fails: false,
            refresh_delay: Duration::from_millis(20),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            refreshed_with: Mutex::new(Vec::new()),
        }
    }

    pub fn refreshing_to(token: String) -> Self {
        let gateway = Self::new();
        *gateway.refresh_result.lock().unwrap() = Ok(token);
        gateway
    }

    pub fn failing_refresh(err: GatewayError) -> Self {
        let gateway = Self::new();
        *gateway.refresh_result.lock().unwrap() = Err(err);
        gateway
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthGateway for FakeGateway {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, GatewayError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if credentials.password != "secret" {
            return Err(GatewayError::Rejected {
                status: 401,
                code: Some("invalid_credentials".to_string()),
                message: "These credentials do not match our records.".to_string(),
            });
        }
        let result = self.login_result.lock().unwrap().clone();
        result.map(|access_token| TokenGrant {
            access_token,
            expires_in: Some(3600),
        })
    }

    async fn logout(&self, _token: &str) -> Result<(), GatewayError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        if self.logout_fails {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        Ok(())
    }

    async fn refresh(&self, token: &str) -> Result<TokenGrant, GatewayError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshed_with.lock().unwrap().push(token.to_string());
        tokio::time::sleep(self.refresh_delay).await;
        let result = self.refresh_result.lock().unwrap().clone();
        result.map(|access_token| TokenGrant {
            access_token,
            expires_in: Some(7200),
        })
    }
}

/// Transport that accepts exactly one bearer token and rejects the rest.
pub struct FakeTransport {
    pub accepted: Mutex<Option<String>>,
    /// Response for any other (or missing) token.
    pub rejection: Mutex<ApiResponse>,
    /// Per-path overrides of `rejection`.
    pub path_rejections: Mutex<HashMap<String, ApiResponse>>,
    pub requests: Mutex<Vec<ApiRequest>>,
    pub offline: bool,
}

impl FakeTransport {
    pub fn accepting(token: &str) -> Self {
        Self {
            accepted: Mutex::new(Some(token.to_string())),
            rejection: Mutex::new(expired_response()),
            path_rejections: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            offline: false,
        }
    }

    pub fn rejecting_with(self, response: ApiResponse) -> Self {
        *self.rejection.lock().unwrap() = response;
        self
    }

    pub fn rejecting_path_with(self, path: &str, response: ApiResponse) -> Self {
        self.path_rejections
            .lock()
            .unwrap()
            .insert(path.to_string(), response);
        self
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::accepting("")
        }
    }

    /// Bearer tokens seen, in order.
    pub fn bearers(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.bearer().map(str::to_string))
            .collect()
    }

    pub fn calls_with(&self, token: &str) -> usize {
        self.bearers()
            .iter()
            .filter(|b| b.as_deref() == Some(token))
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;
        if self.offline {
            return Err(TransportError::new("connection refused"));
        }
        let accepted = self.accepted.lock().unwrap().clone();
        if accepted.is_some() && request.bearer() == accepted.as_deref() {
            return Ok(ApiResponse::new(
                200,
                format!(r#"{{"path":"{}"}}"#, request.path),
            ));
        }
        if let Some(response) = self.path_rejections.lock().unwrap().get(&request.path) {
            return Ok(response.clone());
        }
        Ok(self.rejection.lock().unwrap().clone())
    }
}

/// Memory storage whose writes can be made to fail.
#[derive(Default)]
pub struct FlakyStorage {
    pub inner: MemorySessionStorage,
    pub fail_saves: AtomicBool,
    /// Number of upcoming `clear` calls that fail.
    pub failing_clears: AtomicUsize,
}

impl FlakyStorage {
    pub fn with_token(token: &str) -> Self {
        Self {
            inner: MemorySessionStorage::with_token(token),
            ..Self::default()
        }
    }
}

impl SessionStorage for FlakyStorage {
    fn load(&self) -> anyhow::Result<Option<String>> {
        self.inner.load()
    }

    fn save(&self, token: &str) -> anyhow::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.save(token)
    }

    fn clear(&self) -> anyhow::Result<()> {
        let failing = self.failing_clears.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_clears.store(failing - 1, Ordering::SeqCst);
            anyhow::bail!("device busy");
        }
        self.inner.clear()
    }
}

/// Client over [`FlakyStorage`] with scripted gateway and transport.
pub fn flaky_client(
    storage: &Arc<FlakyStorage>,
    navigator: &Arc<RecordingNavigator>,
    gateway: FakeGateway,
    transport: FakeTransport,
) -> SessionClient {
    SessionClient::new(
        &Config::default(),
        Arc::clone(storage) as Arc<dyn SessionStorage>,
        Arc::clone(navigator) as Arc<dyn Navigator>,
        Arc::new(gateway),
        Arc::new(transport),
    )
}

pub struct Harness {
    pub client: SessionClient,
    pub storage: Arc<MemorySessionStorage>,
    pub navigator: Arc<RecordingNavigator>,
    pub gateway: Arc<FakeGateway>,
    pub transport: Arc<FakeTransport>,
}

impl Harness {
    pub fn new(stored: Option<String>, gateway: FakeGateway, transport: FakeTransport) -> Self {
        let storage = Arc::new(match stored {
            Some(token) => MemorySessionStorage::with_token(token),
            None => MemorySessionStorage::new(),
        });
        let navigator = Arc::new(RecordingNavigator::new());
        let gateway = Arc::new(gateway);
        let transport = Arc::new(transport);
        let client = SessionClient::new(
            &Config::default(),
            Arc::clone(&storage) as Arc<dyn SessionStorage>,
            Arc::clone(&navigator) as Arc<dyn Navigator>,
            Arc::clone(&gateway) as Arc<dyn AuthGateway>,
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        Self {
            client,
            storage,
            navigator,
            gateway,
            transport,
        }
    }

    /// Asserts the store and durable storage hold the same token.
    pub fn assert_in_step(&self) {
        assert_eq!(
            self.client.context().store().token(),
            self.storage.peek(),
            "store and storage diverged"
        );
    }
}
