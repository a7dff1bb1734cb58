//! Configuration service implementation.
//!
//! Loads the dashboard configuration from `~/.config/isdash/config.toml`,
//! writing a default file when none exists.

use crate::paths::IsdashPaths;
use isdash_core::config::DashboardConfig;
use isdash_core::error::{IsdashError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub const GATEWAY_URL_ENV: &str = "ISDASH_GATEWAY_URL";
pub const API_KEY_ENV: &str = "ISDASH_API_KEY";

/// Configuration service that loads and caches the dashboard configuration.
///
/// Environment overrides are applied on every load and never written back
/// to the file.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: IsdashPaths,
    /// Cached configuration, filled on first access.
    config: Arc<RwLock<Option<DashboardConfig>>>,
}

impl ConfigService {
    pub fn new(base: Option<&Path>) -> Self {
        Self {
            paths: IsdashPaths::new(base),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config_path(&self) -> Result<PathBuf> {
        Ok(self.paths.config_file()?)
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<DashboardConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let mut loaded = self.load_config()?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        {
            let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
            *write_lock = Some(loaded.clone());
        }
        Ok(loaded)
    }

    /// Writes `config` to the config file and refreshes the cache.
    pub fn save_config(&self, config: &DashboardConfig) -> Result<()> {
        let path = self.config_path()?;
        write_config(&path, config)?;
        self.invalidate_cache();
        Ok(())
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    fn load_config(&self) -> Result<DashboardConfig> {
        let path = self.config_path()?;
        if !path.exists() {
            tracing::info!(path = %path.display(), "creating default config");
            let config = DashboardConfig::default();
            write_config(&path, &config)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path)?;
        let config: DashboardConfig = toml::from_str(&content).map_err(|e| {
            IsdashError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new(None)
    }
}

fn write_config(path: &Path, config: &DashboardConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Applies `ISDASH_GATEWAY_URL` and `ISDASH_API_KEY` from `lookup`.
///
/// Empty values are ignored.
pub fn apply_env_overrides(config: &mut DashboardConfig, lookup: impl Fn(&str) -> Option<String>) {
    let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    if let Some(url) = set(GATEWAY_URL_ENV) {
        config.api.gateway_url = url;
    }
    if let Some(key) = set(API_KEY_ENV) {
        config.api.api_key = Some(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::new(Some(dir.path()));

        let config = service.get_config().unwrap();

        assert_eq!(config.search, DashboardConfig::default().search);
        let written = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
        let parsed: DashboardConfig = toml::from_str(&written).unwrap();
        assert_eq!(parsed, DashboardConfig::default());
    }

    #[test]
    fn test_existing_file_is_read_and_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\npage_size = 10\n").unwrap();
        let service = ConfigService::new(Some(dir.path()));

        assert_eq!(service.get_config().unwrap().search.page_size, 10);

        std::fs::write(&path, "[search]\npage_size = 20\n").unwrap();
        assert_eq!(service.get_config().unwrap().search.page_size, 10);
        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().search.page_size, 20);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "search = [").unwrap();
        let service = ConfigService::new(Some(dir.path()));

        assert!(service.get_config().unwrap_err().is_config());
    }

    #[test]
    fn test_save_round_trips_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::new(Some(dir.path()));
        let mut config = service.get_config().unwrap();
        config.feed.interval_ms = 1234;

        service.save_config(&config).unwrap();

        assert_eq!(service.get_config().unwrap().feed.interval_ms, 1234);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (GATEWAY_URL_ENV, "https://gateway.example"),
            (API_KEY_ENV, " "),
        ]);
        let mut config = DashboardConfig::default();

        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api.gateway_url, "https://gateway.example");
        assert_eq!(config.api.api_key, None);
    }
}
