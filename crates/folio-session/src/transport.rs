//! Outbound protected calls.
//!
//! [`ApiRequest`] is a plain value: the interceptor attaches credentials to
//! clones of it and never mutates the caller's request.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;

pub const AUTHORIZATION: &str = "authorization";

/// Transport-level failure (connection refused, timeout, TLS, ...).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("network error: {0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            body: Some(body),
            ..Self::new(Method::POST, path)
        }
    }

    /// Adds or replaces a header (names compare case-insensitively).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a copy of this request carrying `token` as a bearer credential.
    #[must_use]
    pub fn authorized(&self, token: &str) -> Self {
        self.clone()
            .with_header(AUTHORIZATION, format!("Bearer {token}"))
    }

    /// The bearer token attached to this request, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.header(AUTHORIZATION)
            .and_then(|v| v.strip_prefix("Bearer "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }

    /// Machine-readable error code (`code`, falling back to `error`).
    pub fn error_code(&self) -> Option<String> {
        let body: ErrorBody = self.json().ok()?;
        body.code.or(body.error)
    }

    /// Human-readable error message, if the body carries one.
    pub fn error_message(&self) -> Option<String> {
        self.json::<ErrorBody>().ok()?.message
    }
}

/// Sends requests to the backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// reqwest-backed transport rooted at `api.base_url`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    api: ApiConfig,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client, api: ApiConfig) -> Self {
        Self { http, api }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.api.url(&request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(format!("{} {url}: {e}", request.method)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("reading response from {url}: {e}")))?;

        tracing::debug!(method = %request.method, path = %request.path, status, "api call");
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorized_clones_request() {
        let original = ApiRequest::get("/companies").with_header("X-Tenant", "7");
        let signed = original.authorized("abc");

        assert_eq!(original.bearer(), None);
        assert_eq!(signed.bearer(), Some("abc"));
        assert_eq!(signed.header("x-tenant"), Some("7"));

        let resigned = signed.authorized("def");
        assert_eq!(resigned.bearer(), Some("def"));
        assert_eq!(
            resigned
                .headers
                .iter()
                .filter(|(n, _)| n == AUTHORIZATION)
                .count(),
            1
        );
    }

    #[test]
    fn test_error_code_extraction() {
        let expired = ApiResponse::new(401, r#"{"code":"token_expired","message":"Token has expired"}"#);
        assert_eq!(expired.error_code().as_deref(), Some("token_expired"));
        assert_eq!(expired.error_message().as_deref(), Some("Token has expired"));

        let legacy = ApiResponse::new(400, r#"{"error":"token_invalid"}"#);
        assert_eq!(legacy.error_code().as_deref(), Some("token_invalid"));

        let html = ApiResponse::new(500, "<html>oops</html>");
        assert_eq!(html.error_code(), None);
        assert!(!html.is_success());
    }
}
