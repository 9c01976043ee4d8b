//! Configuration management for Folio.
//!
//! Loads configuration from ${FOLIO_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "FOLIO_API_URL";

/// Backend endpoints used by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every path below is joined to.
    pub base_url: String,
    pub login_path: String,
    pub logout_path: String,
    pub refresh_path: String,
    /// Transport-level timeout applied to every request, refresh included.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            login_path: "/auth/login".to_string(),
            logout_path: "/auth/logout".to_string(),
            refresh_path: "/auth/refresh".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    /// Joins `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns true for the endpoints that issue tokens.
    ///
    /// Calls to these never carry the session token and never trigger a refresh.
    pub fn is_token_endpoint(&self, path: &str) -> bool {
        let path = normalize(path);
        path == normalize(&self.login_path) || path == normalize(&self.refresh_path)
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.trim_matches('/')
}

/// Machine-readable rejection codes sent by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Codes meaning the token expired and may be refreshed.
    pub expired_codes: Vec<String>,
    /// Codes meaning the token was tampered with or revoked.
    pub invalid_codes: Vec<String>,
    /// File (relative to FOLIO_HOME) holding the persisted token.
    pub storage_file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expired_codes: vec!["token_expired".to_string()],
            invalid_codes: vec![
                "token_invalid".to_string(),
                "token_revoked".to_string(),
                "token_blacklisted".to_string(),
            ],
            storage_file: "session.json".to_string(),
        }
    }
}

/// How the backend described a rejected token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Expired,
    Invalid,
}

impl SessionConfig {
    /// Classifies a rejection code. Unknown codes return `None`.
    pub fn classify(&self, code: &str) -> Option<RejectionKind> {
        let matches = |codes: &[String]| codes.iter().any(|c| c.eq_ignore_ascii_case(code));
        if matches(&self.expired_codes) {
            Some(RejectionKind::Expired)
        } else if matches(&self.invalid_codes) {
            Some(RejectionKind::Invalid)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                config.api.base_url = url.to_string();
            }
        }
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Renders the default configuration as TOML.
    pub fn generate() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to render default config")
    }

    /// Writes a default config file at `path`. Fails if one already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, Self::generate()?)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

pub mod paths {
    //! Path resolution for Folio configuration and data directories.
    //!
    //! FOLIO_HOME resolution order:
    //! 1. FOLIO_HOME environment variable (if set)
    //! 2. ~/.config/folio (default)
    //! 3. ./.folio when no home directory can be determined

    use std::path::PathBuf;

    pub fn folio_home() -> PathBuf {
        if let Ok(home) = std::env::var("FOLIO_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".folio"),
            |h| h.join(".config").join("folio"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        folio_home().join("config.toml")
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> PathBuf {
        folio_home().join("logs")
    }
}
