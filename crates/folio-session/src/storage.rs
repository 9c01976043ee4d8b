//! Durable session storage.
//!
//! Holds exactly one slot: the current bearer token, verbatim, under the
//! fixed key [`TOKEN_KEY`]. Nothing else about the session is persisted;
//! identity is always re-derived from the token on load.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::config::{Config, paths};

/// Key the bearer token is stored under.
pub const TOKEN_KEY: &str = "token";

/// Persistence boundary for the bearer token.
///
/// Only the session writers (effects and the refresh coordinator) call
/// `save`/`clear`; guards only `load`.
pub trait SessionStorage: Send + Sync {
    /// Returns the stored token, if any.
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    /// Removes the stored token. Clearing an empty slot is not an error.
    fn clear(&self) -> Result<()>;

    /// Returns true if a token is present. Read failures count as absent.
    fn has_token(&self) -> bool {
        match self.load() {
            Ok(token) => token.is_some(),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "session storage unreadable");
                false
            }
        }
    }
}

/// Stores the token in a JSON file with restricted permissions (0600).
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Storage file under FOLIO_HOME, as named by the config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(paths::folio_home().join(&config.session.storage_file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, slots: &BTreeMap<String, String>) -> Result<()> {
        let path = &self.path;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(slots).context("Failed to serialize session")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("Failed to open {} for writing", path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        Ok(())
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Result<Option<String>> {
        let path = &self.path;
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session from {}", path.display()))?;
        let mut slots: BTreeMap<String, String> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", path.display()))?;

        Ok(slots.remove(TOKEN_KEY).filter(|token| !token.is_empty()))
    }

    fn save(&self, token: &str) -> Result<()> {
        let slots = BTreeMap::from([(TOKEN_KEY.to_string(), token.to_string())]);
        self.write(&slots)
    }

    /// Removes the file. If it cannot be removed (read-only directory),
    /// the token slot is overwritten with an empty map instead.
    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cannot remove session file; emptying it");
                self.write(&BTreeMap::new()).with_context(|| {
                    format!("Failed to remove {}: {err}", self.path.display())
                })
            }
        }
    }
}

/// In-memory storage for tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(token.into())),
        }
    }

    /// Current slot value, bypassing the trait.
    pub fn peek(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.peek())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("nested").join("session.json"));

        assert_eq!(storage.load().unwrap(), None);
        storage.save("header.payload.sig").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("header.payload.sig"));

        let raw = fs::read_to_string(storage.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json[TOKEN_KEY], "header.payload.sig");
        assert_eq!(json.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_file_storage_clear_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("session.json"));

        storage.clear().unwrap();
        storage.save("t").unwrap();
        storage.clear().unwrap();
        storage.clear().unwrap();
        assert_eq!(storage.load().unwrap(), None);
        assert!(!storage.has_token());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileSessionStorage::new(path);
        assert!(storage.load().is_err());
        assert!(!storage.has_token());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let storage = FileSessionStorage::new(dir.path().join("session.json"));
        storage.save("t").unwrap();

        let mode = fs::metadata(storage.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_in_read_only_directory_empties_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        let storage = FileSessionStorage::new(locked.join("session.json"));
        storage.save("t").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        let cleared = storage.clear();
        let loaded = storage.load();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        cleared.unwrap();
        assert_eq!(loaded.unwrap(), None);
    }

    #[test]
    fn test_memory_storage() {
        let storage = MemorySessionStorage::with_token("abc");
        assert!(storage.has_token());
        storage.clear().unwrap();
        assert_eq!(storage.peek(), None);
        storage.save("def").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("def"));
    }
}
