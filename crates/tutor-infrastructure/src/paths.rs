//! Unified path management for tutor configuration files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/tutor/             # Config directory (platform default via `dirs`)
//! ├── config.toml              # Client configuration
//! ├── credentials.json         # Backend access token
//! ├── diagrams/                # Diagrams exported by `--out-dir` defaults
//! └── logs/                    # Application logs
//!     └── tutor.log.YYYY-MM-DD
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use tutor_core::TutorError;

pub const APP_DIR_NAME: &str = "tutor";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform configuration directory could not be determined.
    ConfigDirNotFound,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find configuration directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for TutorError {
    fn from(err: PathError) -> Self {
        TutorError::config(err.to_string())
    }
}

/// Resolves every on-disk location the client uses.
///
/// A base path replaces the platform config directory entirely, which keeps
/// tests and `--config-dir` runs isolated from the user's real files.
#[derive(Debug, Clone, Default)]
pub struct TutorPaths {
    base: Option<PathBuf>,
}

impl TutorPaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Path of the stored access token.
    ///
    /// Keep this file readable by the owner only.
    pub fn credentials_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("credentials.json"))
    }

    pub fn log_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("logs"))
    }

    pub fn diagrams_dir(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("diagrams"))
    }
}
