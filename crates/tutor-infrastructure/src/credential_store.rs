//! Credential loading.
//!
//! The access token is resolved in priority order:
//! 1. an explicit value (the `--token` flag)
//! 2. the `TUTOR_TOKEN` environment variable
//! 3. `credentials.json` in the config directory

use crate::paths::TutorPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tutor_core::{Credential, Result, TutorError};

pub const TOKEN_ENV: &str = "TUTOR_TOKEN";

#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_paths(paths: &TutorPaths) -> Result<Self> {
        Ok(Self::new(paths.credentials_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolves the credential from the process environment.
    pub fn load(&self, explicit: Option<&str>) -> Result<Credential> {
        self.resolve(explicit, std::env::var(TOKEN_ENV).ok())
    }

    /// Resolves the credential from an explicit value, an environment value,
    /// or the credentials file, in that order.
    pub fn resolve(&self, explicit: Option<&str>, env_value: Option<String>) -> Result<Credential> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            tracing::debug!("[CredentialStore] Using explicit token");
            return Ok(Credential::new(token));
        }
        if let Some(token) = env_value.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            tracing::debug!("[CredentialStore] Using {}", TOKEN_ENV);
            return Ok(Credential::new(token));
        }
        self.read_file()
    }

    fn read_file(&self) -> Result<Credential> {
        if !self.path.exists() {
            return Err(TutorError::config(format!(
                "No access token: pass --token, set {} or create {}",
                TOKEN_ENV,
                self.path.display()
            )));
        }

        let content = std::fs::read_to_string(&self.path)?;
        let file: CredentialFile = serde_json::from_str(&content)?;
        let credential = Credential::new(file.access_token.trim());
        if credential.is_empty() {
            return Err(TutorError::config(format!(
                "{} has an empty access_token",
                self.path.display()
            )));
        }
        tracing::debug!("[CredentialStore] Using {}", self.path.display());
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(content: Option<&str>) -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        if let Some(content) = content {
            std::fs::write(&path, content).unwrap();
        }
        (dir, CredentialStore::new(path))
    }

    #[test]
    fn explicit_beats_env_and_file() {
        let (_dir, store) = store_with(Some(r#"{"access_token": "from-file"}"#));
        let credential = store
            .resolve(Some("from-flag"), Some("from-env".into()))
            .unwrap();
        assert_eq!(credential.token(), "from-flag");
    }

    #[test]
    fn env_beats_file() {
        let (_dir, store) = store_with(Some(r#"{"access_token": "from-file"}"#));
        let credential = store.resolve(None, Some("from-env".into())).unwrap();
        assert_eq!(credential.token(), "from-env");
    }

    #[test]
    fn falls_back_to_file() {
        let (_dir, store) = store_with(Some(r#"{"access_token": " from-file "}"#));
        let credential = store.resolve(Some("  "), None).unwrap();
        assert_eq!(credential.token(), "from-file");
    }

    #[test]
    fn missing_everything_is_config_error() {
        let (_dir, store) = store_with(None);
        let err = store.resolve(None, None).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn empty_token_in_file_is_rejected() {
        let (_dir, store) = store_with(Some(r#"{"access_token": ""}"#));
        assert!(store.resolve(None, None).unwrap_err().is_config());
    }
}
