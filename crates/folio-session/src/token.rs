//! Bearer token claim parsing.
//!
//! Tokens use the compact `header.payload.signature` layout. Only the payload
//! is read: the signature is **not verified**. The client holds no signing
//! secret, so claims are used for display and routing only and every
//! protected call is re-authorized by the server.

use base64::prelude::*;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Failure to parse a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Kind of account the token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Admin,
    #[default]
    Client,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Admin => "admin",
            AccountType::Client => "client",
        }
    }
}

/// A company (tenant) the user has access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The user a token was issued to. Always derived from claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub account_type: AccountType,
    pub email_verified_at: Option<DateTime<Utc>>,
    /// In claim order. May be empty.
    pub companies: Vec<Company>,
}

impl UserIdentity {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }
}

/// Structured claims extracted from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub identity: UserIdentity,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenClaims {
    /// Returns true if the `exp` claim lies at or before `now`.
    ///
    /// A token without `exp` never reports as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Raw JSON payload of a token, as issued by the backend.
///
/// Every field except `sub` is optional; [`to_identity`] documents the
/// defaults applied when a field is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(deserialize_with = "string_or_number")]
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_verified_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companies: Option<Vec<Company>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Parses a bearer token into claims without verifying its signature.
pub fn decode(token: &str) -> Result<TokenClaims, DecodeError> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(DecodeError::Malformed(
            "expected three dot-separated segments".to_string(),
        ));
    };

    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| DecodeError::Malformed(format!("payload is not base64url: {e}")))?;
    let set: ClaimSet = serde_json::from_slice(&bytes)
        .map_err(|e| DecodeError::Malformed(format!("payload is not a claim set: {e}")))?;

    if set.sub.is_empty() {
        return Err(DecodeError::Malformed("missing subject".to_string()));
    }

    Ok(TokenClaims {
        identity: to_identity(&set),
        issued_at: set.iat.and_then(timestamp),
        expires_at: set.exp.and_then(timestamp),
    })
}

/// Maps a raw claim set to a user identity.
///
/// Defaults: missing `name`/`email` become empty strings, missing `type` is
/// a client account, missing `email_verified_at` means unverified and missing
/// `companies` is an empty list.
pub fn to_identity(claims: &ClaimSet) -> UserIdentity {
    UserIdentity {
        id: claims.sub.clone(),
        display_name: claims.name.clone().unwrap_or_default(),
        email: claims.email.clone().unwrap_or_default(),
        account_type: claims.account_type.unwrap_or_default(),
        email_verified_at: claims.email_verified_at,
        companies: claims.companies.clone().unwrap_or_default(),
    }
}

/// Builds an unsigned token (`alg: none`) carrying `claims`.
///
/// Intended for fixtures and local tooling; the backend will reject it.
pub fn encode_unsigned(claims: &ClaimSet) -> String {
    let header = BASE64_URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = serde_json::to_vec(claims).unwrap_or_default();
    format!("{header}.{}.", BASE64_URL_SAFE_NO_PAD.encode(payload))
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 {
        return "***".to_string();
    }
    match token.get(..12) {
        Some(prefix) => format!("{prefix}..."),
        None => "***".to_string(),
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}
