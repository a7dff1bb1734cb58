//! File-backed authentication store.

use async_trait::async_trait;
use isdash_core::auth::{AuthRepository, AuthState, AuthenticationData};
use isdash_core::error::Result;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::paths::IsdashPaths;

/// Stores `AuthenticationData` as JSON and keeps it cached in memory.
///
/// The cache answers `AuthState` queries, so the file is only read once
/// when the store is opened.
#[derive(Debug, Clone)]
pub struct FileAuthStore {
    path: PathBuf,
    cached: Arc<RwLock<Option<AuthenticationData>>>,
}

impl FileAuthStore {
    /// Opens the store at the default location (`auth.json` in the config dir).
    pub async fn open_default(base: Option<&Path>) -> Result<Self> {
        let path = IsdashPaths::new(base).auth_file()?;
        Self::open(path).await
    }

    /// Opens the store at `path`, reading any data already saved there.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = read_file(&path).await?;
        tracing::debug!(
            path = %path.display(),
            authenticated = data.as_ref().is_some_and(AuthenticationData::is_authenticated),
            "opened auth store"
        );
        Ok(Self {
            path,
            cached: Arc::new(RwLock::new(data)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current data, from memory.
    pub fn current(&self) -> Option<AuthenticationData> {
        self.cached
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_cached(&self, data: Option<AuthenticationData>) {
        *self.cached.write().unwrap_or_else(|e| e.into_inner()) = data;
    }
}

async fn read_file(path: &Path) -> Result<Option<AuthenticationData>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) if content.trim().is_empty() => Ok(None),
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl AuthState for FileAuthStore {
    fn is_authenticated(&self) -> bool {
        self.cached
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(AuthenticationData::is_authenticated)
    }
}

#[async_trait]
impl AuthRepository for FileAuthStore {
    async fn load(&self) -> Result<Option<AuthenticationData>> {
        Ok(self.current())
    }

    async fn save(&self, data: &AuthenticationData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&self.path, json).await?;
        self.set_cached(Some(data.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.set_cached(None);
        Ok(())
    }
}
