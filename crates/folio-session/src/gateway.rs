//! Backend `/auth/*` endpoints.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ApiConfig;
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport, TransportError};

/// Email/password pair sent to the login endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Token issued by login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    #[serde(alias = "token")]
    pub access_token: String,
    /// Lifetime in seconds, when the issuer reports it.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The backend answered with a non-success status.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected {
        status: u16,
        /// Machine-readable code from the error body.
        code: Option<String>,
        message: String,
    },
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        GatewayError::Transport(err.0)
    }
}

/// Remote token issuer.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, GatewayError>;
    async fn logout(&self, token: &str) -> Result<(), GatewayError>;
    /// Exchanges the current token for a fresh one.
    async fn refresh(&self, token: &str) -> Result<TokenGrant, GatewayError>;
}

/// [`AuthGateway`] over HTTP.
///
/// Goes straight to the transport: token endpoints never pass through the
/// request interceptor.
#[derive(Debug, Clone)]
pub struct HttpAuthGateway {
    transport: HttpTransport,
    api: ApiConfig,
}

impl HttpAuthGateway {
    pub fn new(http: reqwest::Client, api: ApiConfig) -> Self {
        Self {
            transport: HttpTransport::new(http, api.clone()),
            api,
        }
    }

    async fn call(&self, request: ApiRequest) -> Result<ApiResponse, GatewayError> {
        let response = self.transport.send(&request).await?;
        if response.is_success() {
            return Ok(response);
        }
        Err(GatewayError::Rejected {
            status: response.status,
            code: response.error_code(),
            message: response.error_message().unwrap_or_default(),
        })
    }

    fn grant(response: &ApiResponse) -> Result<TokenGrant, GatewayError> {
        response
            .json()
            .map_err(|e| GatewayError::InvalidResponse(format!("token response: {e}")))
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(&self, credentials: &Credentials) -> Result<TokenGrant, GatewayError> {
        let body = serde_json::json!({
            "email": credentials.email,
            "password": credentials.password,
        });
        let response = self
            .call(ApiRequest::post(&self.api.login_path, body))
            .await?;
        Self::grant(&response)
    }

    async fn logout(&self, token: &str) -> Result<(), GatewayError> {
        let request = ApiRequest::post(&self.api.logout_path, serde_json::json!({}));
        self.call(request.authorized(token)).await.map(|_| ())
    }

    async fn refresh(&self, token: &str) -> Result<TokenGrant, GatewayError> {
        let request = ApiRequest::post(&self.api.refresh_path, serde_json::json!({}));
        let response = self.call(request.authorized(token)).await?;
        Self::grant(&response)
    }
}
