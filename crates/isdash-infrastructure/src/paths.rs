//! Path management for isdash configuration files.
//!
//! ```text
//! ~/.config/isdash/            # Config directory
//! ├── config.toml              # Dashboard configuration
//! └── auth.json                # Stored authentication data
//! ```

use isdash_core::error::IsdashError;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "isdash";
const CONFIG_FILE: &str = "config.toml";
const AUTH_FILE: &str = "auth.json";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for IsdashError {
    fn from(err: PathError) -> Self {
        IsdashError::config(err.to_string())
    }
}

/// Resolves isdash file locations.
///
/// Paths live under the platform config directory unless a base directory
/// is given, which tests use to stay inside a temp dir.
#[derive(Debug, Clone)]
pub struct IsdashPaths {
    base: Option<PathBuf>,
}

impl IsdashPaths {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            base: base.map(Path::to_path_buf),
        }
    }

    /// Returns the isdash configuration directory.
    ///
    /// # Returns
    ///
    /// - `Ok(PathBuf)`: e.g. `~/.config/isdash/`, or the base directory
    /// - `Err(PathError::ConfigDirNotFound)`: no platform config directory
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::ConfigDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join(CONFIG_FILE))
    }

    /// Returns the path of the stored authentication data.
    pub fn auth_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join(AUTH_FILE))
    }
}

impl Default for IsdashPaths {
    fn default() -> Self {
        Self::new(None)
    }
}
