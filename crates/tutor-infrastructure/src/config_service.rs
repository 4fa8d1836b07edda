//! Configuration service implementation.
//!
//! Loads the client configuration from `~/.config/tutor/config.toml`, applies
//! environment overrides and caches the result.

use crate::paths::TutorPaths;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tutor_core::config::ClientConfig;
use tutor_core::{Result, TutorError};

pub const BACKEND_URL_ENV: &str = "TUTOR_BACKEND_URL";
pub const MERMAID_BIN_ENV: &str = "MERMAID_BIN";

/// Configuration service that loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the default config file location.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(TutorPaths::default().config_file()?))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// A missing file yields the defaults; an unreadable or invalid file is
    /// an error.
    pub fn get_config(&self) -> Result<ClientConfig> {
        {
            let read_lock = self
                .config
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(cached) = read_lock.as_ref() {
                return Ok(cached.clone());
            }
        }

        let mut loaded = Self::load_from(&self.path)?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        let mut write_lock = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *write_lock = Some(loaded.clone());
        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *write_lock = None;
    }

    fn load_from(path: &Path) -> Result<ClientConfig> {
        if !path.exists() {
            tracing::debug!("[ConfigService] {} not found, using defaults", path.display());
            return Ok(ClientConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|err| {
            TutorError::config(format!("Invalid config file {}: {}", path.display(), err))
        })
    }
}

/// Applies environment overrides through `lookup`.
pub fn apply_env_overrides(config: &mut ClientConfig, lookup: impl Fn(&str) -> Option<String>) {
    let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = present(BACKEND_URL_ENV) {
        config.backend.base_url = url;
    }
    if let Some(bin) = present(MERMAID_BIN_ENV) {
        config.diagram.mermaid_bin = bin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tutor_core::config::DEFAULT_BACKEND_URL;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::with_path(dir.path().join("config.toml"));
        let config = ConfigService::load_from(service.path()).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn reads_and_caches_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[rendering]\nrepeat_narrative_after_diagram = true\nmax_concurrent_compiles = 2\n",
        )
        .unwrap();

        let service = ConfigService::with_path(&path);
        let config = service.get_config().unwrap();
        assert!(config.rendering.repeat_narrative_after_diagram);
        assert_eq!(config.rendering.max_concurrent_compiles, 2);

        std::fs::write(&path, "[rendering]\nmax_concurrent_compiles = 8\n").unwrap();
        assert_eq!(service.get_config().unwrap().rendering.max_concurrent_compiles, 2);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().rendering.max_concurrent_compiles, 8);
    }

    #[test]
    fn invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[rendering\nbroken").unwrap();

        let err = ConfigService::with_path(&path).get_config().unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (BACKEND_URL_ENV, "https://tutor.example"),
            (MERMAID_BIN_ENV, "  "),
        ]);
        let mut config = ClientConfig::default();

        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.base_url, "https://tutor.example");
        assert_eq!(config.diagram.mermaid_bin, "mmdc");
        assert_ne!(config.backend.base_url, DEFAULT_BACKEND_URL);
    }
}
