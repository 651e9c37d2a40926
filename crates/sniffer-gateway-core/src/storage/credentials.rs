//! Account credentials for the aggregation server.
//!
//! The token is read at send time, so rotating it here takes effect on the
//! next dispatch cycle without touching queued requests.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// File name of the credentials inside the data directory
pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Process-wide credential state, optionally backed by a file.
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    current: RwLock<Credentials>,
}

impl CredentialStore {
    /// Load `credentials.json` from `dir`, starting empty if it's absent.
    pub fn open(dir: &Path) -> Result<Self, ConfigError> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join(CREDENTIALS_FILE);
        let current = read_credentials(&path)?;

        Ok(Self {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    /// Store that never touches disk.
    pub fn in_memory(credentials: Credentials) -> Self {
        Self {
            path: None,
            current: RwLock::new(credentials),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn credentials(&self) -> Credentials {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current bearer token, if one is configured.
    pub fn token(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
    }

    /// Replace the token and persist it.
    pub fn set_token(&self, token: impl Into<String>) -> Result<(), ConfigError> {
        self.update(|creds| creds.access_token = Some(token.into()))?;
        info!("access token rotated");
        Ok(())
    }

    pub fn set_username(&self, username: impl Into<String>) -> Result<(), ConfigError> {
        self.update(|creds| creds.username = Some(username.into()))
    }

    /// Re-read the backing file, picking up edits made by other processes.
    pub fn reload(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            let fresh = read_credentials(path)?;
            *self.current.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        }
        Ok(())
    }

    fn update(&self, change: impl FnOnce(&mut Credentials)) -> Result<(), ConfigError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = current.clone();
        change(&mut next);

        if let Some(path) = &self.path {
            let content = serde_json::to_string_pretty(&next)?;
            std::fs::write(path, content)?;
        }

        *current = next;
        Ok(())
    }
}

fn read_credentials(path: &Path) -> Result<Credentials, ConfigError> {
    if !path.exists() {
        return Ok(Credentials::default());
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Credentials::default());
    }

    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(tmp.path()).unwrap();

        assert_eq!(store.token(), None);
        assert_eq!(store.credentials(), Credentials::default());
    }

    #[test]
    fn test_set_token_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(tmp.path()).unwrap();

        store.set_username("kennel-admin").unwrap();
        store.set_token("abc123").unwrap();
        assert_eq!(store.token().as_deref(), Some("abc123"));

        let reopened = CredentialStore::open(tmp.path()).unwrap();
        let creds = reopened.credentials();
        assert_eq!(creds.username.as_deref(), Some("kennel-admin"));
        assert_eq!(creds.access_token.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_reload_picks_up_external_edit() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(tmp.path()).unwrap();
        store.set_token("old").unwrap();

        std::fs::write(
            tmp.path().join(CREDENTIALS_FILE),
            r#"{"access_token": "new"}"#,
        )
        .unwrap();
        store.reload().unwrap();

        assert_eq!(store.token().as_deref(), Some("new"));
    }

    #[test]
    fn test_empty_token_is_none() {
        let store = CredentialStore::in_memory(Credentials {
            username: None,
            access_token: Some(String::new()),
        });
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_in_memory_rotation() {
        let store = CredentialStore::in_memory(Credentials::default());
        store.set_token("t1").unwrap();
        store.set_token("t2").unwrap();

        assert_eq!(store.token().as_deref(), Some("t2"));
        assert!(store.path().is_none());
    }
}
