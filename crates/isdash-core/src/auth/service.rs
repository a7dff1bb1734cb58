use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::auth::AuthenticationData;
use crate::error::Result;

/// Read-only view of whether the dashboard is authenticated.
///
/// Read once per search start and once per page fetch, so implementations
/// must answer from memory.
pub trait AuthState: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Persistent storage for the authenticated session.
#[async_trait]
pub trait AuthRepository: Send + Sync {
    /// Returns the stored session, or `None` when logged out.
    async fn load(&self) -> Result<Option<AuthenticationData>>;

    async fn save(&self, data: &AuthenticationData) -> Result<()>;

    /// Removes the stored session. Succeeds when nothing is stored.
    async fn clear(&self) -> Result<()>;
}

/// In-memory authentication flag.
#[derive(Debug, Default)]
pub struct StaticAuthState {
    authenticated: AtomicBool,
}

impl StaticAuthState {
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated: AtomicBool::new(authenticated),
        }
    }

    pub fn set(&self, authenticated: bool) {
        self.authenticated.store(authenticated, Ordering::SeqCst);
    }
}

impl AuthState for StaticAuthState {
    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}
