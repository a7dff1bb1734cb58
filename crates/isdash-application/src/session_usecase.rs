//! Dashboard session use case.
//!
//! Owns the authenticated session: login and logout, the periodic JWT
//! expiry check, and the session-dependent search options. Logging out
//! clears every component registered as session scoped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use isdash_core::auth::{AuthRepository, AuthenticationData};
use isdash_core::channel::ChannelReader;
use isdash_core::config::{AuthSettings, SearchSettings};
use isdash_core::error::{IsdashError, Result};
use isdash_core::notification::{Notification, NotificationSink};
use isdash_core::search::{PaginatedFetchService, SearchFilters, SearchOptions};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::channel_feed::ChannelFeedReader;
use crate::search::IncrementalSearchController;

pub const JWT_EXPIRED_MESSAGE: &str = "JWT expired. Please login again.";
pub const JWT_UNREADABLE_MESSAGE: &str = "Impossible to check JWT expiration.";

/// State that must not outlive the authenticated session.
pub trait SessionScoped: Send + Sync {
    fn clear_session_state(&self);
}

impl<S: PaginatedFetchService + 'static> SessionScoped for IncrementalSearchController<S> {
    fn clear_session_state(&self) {
        self.reset();
    }
}

impl<R: ChannelReader + 'static> SessionScoped for ChannelFeedReader<R> {
    fn clear_session_state(&self) {
        self.stop_reading();
    }
}

/// Use case for the authenticated dashboard session.
#[derive(Clone)]
pub struct DashboardSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    repository: Arc<dyn AuthRepository>,
    scoped: Vec<Arc<dyn SessionScoped>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    search: SearchSettings,
    auth: AuthSettings,
    /// "Created by me" toggle of the identity list
    created_by_me: AtomicBool,
    expiry_watch: Mutex<Option<CancellationToken>>,
}

impl DashboardSession {
    /// Creates a session over `repository`.
    ///
    /// # Arguments
    ///
    /// * `repository` - Persistent store of the authentication data
    /// * `scoped` - Components cleared on logout (search controllers, feed reader)
    /// * `notifier` - Receives expiry notifications
    pub fn new(
        repository: Arc<dyn AuthRepository>,
        scoped: Vec<Arc<dyn SessionScoped>>,
        notifier: Option<Arc<dyn NotificationSink>>,
        search: SearchSettings,
        auth: AuthSettings,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                repository,
                scoped,
                notifier,
                search,
                auth,
                created_by_me: AtomicBool::new(false),
                expiry_watch: Mutex::new(None),
            }),
        }
    }

    /// Stores the credentials; the dashboard is authenticated afterwards.
    pub async fn login(&self, did: impl Into<String>, jwt: impl Into<String>) -> Result<()> {
        let data = AuthenticationData::new(did, jwt);
        if !data.is_authenticated() {
            return Err(IsdashError::InvalidToken("empty JWT".into()));
        }
        self.inner.repository.save(&data).await?;
        tracing::info!(did = %data.did, "logged in");
        Ok(())
    }

    /// Clears the credentials and every session-scoped component.
    pub async fn logout(&self) -> Result<()> {
        self.inner.logout().await
    }

    pub async fn current(&self) -> Result<Option<AuthenticationData>> {
        self.inner.repository.load().await
    }

    pub async fn authenticated_did(&self) -> Result<Option<String>> {
        Ok(self
            .current()
            .await?
            .filter(AuthenticationData::is_authenticated)
            .map(|data| data.did))
    }

    pub fn set_created_by_me(&self, enabled: bool) {
        self.inner.created_by_me.store(enabled, Ordering::SeqCst);
    }

    pub fn created_by_me(&self) -> bool {
        self.inner.created_by_me.load(Ordering::SeqCst)
    }

    /// Options for an identity search issued from the dashboard.
    ///
    /// The first load asks for the welcome list size; later searches use the
    /// default request limit. The owner filter is the user's own DID when
    /// "created by me" is on.
    pub async fn identity_search_options(&self, first_load: bool) -> Result<SearchOptions> {
        let limit = if first_load {
            self.inner.search.welcome_list_size
        } else {
            self.inner.search.page_size
        };
        let mut filters = SearchFilters::new();
        if self.created_by_me() {
            if let Some(did) = self.authenticated_did().await? {
                filters = filters.with_owner(did);
            }
        }
        Ok(SearchOptions::new().with_limit(limit).with_filters(filters))
    }

    /// Logs out when the stored JWT has expired. Returns whether it had.
    pub async fn check_expiry(&self) -> Result<bool> {
        self.inner.check_expiry().await
    }

    /// Starts the periodic expiry check, replacing a running one.
    pub fn start_expiry_watch(&self) {
        let cancel = CancellationToken::new();
        if let Some(previous) = self.inner.lock_watch().replace(cancel.clone()) {
            previous.cancel();
        }

        let inner = self.inner.clone();
        let period = inner.auth.jwt_check_interval();
        tracing::debug!(?period, "starting JWT expiry watch");
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = inner.check_expiry().await {
                            tracing::warn!(error = %e, "JWT expiry check failed");
                        }
                    }
                }
            }
        });
    }

    pub fn stop_expiry_watch(&self) {
        if let Some(cancel) = self.inner.lock_watch().take() {
            cancel.cancel();
        }
    }
}

impl SessionInner {
    fn lock_watch(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.expiry_watch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(Notification::error(message));
        }
    }

    async fn logout(&self) -> Result<()> {
        self.repository.clear().await?;
        for component in &self.scoped {
            component.clear_session_state();
        }
        tracing::info!("logged out");
        Ok(())
    }

    async fn check_expiry(&self) -> Result<bool> {
        let Some(data) = self.repository.load().await? else {
            return Ok(false);
        };
        if !data.is_authenticated() {
            return Ok(false);
        }

        match data.claims() {
            Ok(claims) if claims.is_expired_at(Utc::now()) => {
                tracing::info!(did = %data.did, "JWT expired");
                self.logout().await?;
                self.notify(JWT_EXPIRED_MESSAGE);
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read JWT expiry");
                self.notify(JWT_UNREADABLE_MESSAGE);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct MemoryAuthRepository {
        data: Mutex<Option<AuthenticationData>>,
    }

    #[async_trait]
    impl AuthRepository for MemoryAuthRepository {
        async fn load(&self) -> Result<Option<AuthenticationData>> {
            Ok(self.data.lock().unwrap().clone())
        }

        async fn save(&self, data: &AuthenticationData) -> Result<()> {
            *self.data.lock().unwrap() = Some(data.clone());
            Ok(())
        }

        async fn clear(&self) -> Result<()> {
            *self.data.lock().unwrap() = None;
            Ok(())
        }
    }

    #[derive(Default)]
    struct ClearCounter(AtomicUsize);

    impl SessionScoped for ClearCounter {
        fn clear_session_state(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Messages(Mutex<Vec<String>>);

    impl NotificationSink for Messages {
        fn notify(&self, notification: Notification) -> String {
            self.0.lock().unwrap().push(notification.message);
            String::new()
        }
    }

    fn jwt_expiring_at(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"EdDSA","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{}}}"#, exp));
        format!("{}.{}.sig", header, body)
    }

    struct Fixture {
        session: DashboardSession,
        repository: Arc<MemoryAuthRepository>,
        cleared: Arc<ClearCounter>,
        messages: Arc<Messages>,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(MemoryAuthRepository::default());
        let cleared = Arc::new(ClearCounter::default());
        let messages = Arc::new(Messages::default());
        let session = DashboardSession::new(
            repository.clone(),
            vec![cleared.clone() as Arc<dyn SessionScoped>],
            Some(messages.clone() as Arc<dyn NotificationSink>),
            SearchSettings::default(),
            AuthSettings {
                jwt_check_interval_secs: 60,
            },
        );
        Fixture {
            session,
            repository,
            cleared,
            messages,
        }
    }

    #[tokio::test]
    async fn test_login_then_logout_clears_scoped_state() {
        let f = fixture();
        f.session.login("did:iota:me", "a.b.c").await.unwrap();
        assert_eq!(
            f.session.authenticated_did().await.unwrap().as_deref(),
            Some("did:iota:me")
        );

        f.session.logout().await.unwrap();

        assert!(f.repository.data.lock().unwrap().is_none());
        assert_eq!(f.cleared.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_rejects_empty_jwt() {
        let f = fixture();
        let err = f.session.login("did:iota:me", "").await.unwrap_err();
        assert!(matches!(err, IsdashError::InvalidToken(_)));
        assert!(f.session.current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identity_search_options() {
        let f = fixture();
        f.session.login("did:iota:me", "a.b.c").await.unwrap();

        let first = f.session.identity_search_options(true).await.unwrap();
        assert_eq!(first.limit, Some(5));
        assert!(first.filters.is_empty());

        f.session.set_created_by_me(true);
        let later = f.session.identity_search_options(false).await.unwrap();
        assert_eq!(later.limit, Some(2));
        assert_eq!(later.filters.owner(), Some("did:iota:me"));
    }

    #[tokio::test]
    async fn test_expired_jwt_logs_out_and_notifies() {
        let f = fixture();
        let past = Utc::now().timestamp() - 10;
        f.session
            .login("did:iota:me", jwt_expiring_at(past))
            .await
            .unwrap();

        assert!(f.session.check_expiry().await.unwrap());
        assert!(f.session.current().await.unwrap().is_none());
        assert_eq!(
            *f.messages.0.lock().unwrap(),
            vec![JWT_EXPIRED_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_unreadable_jwt_is_reported_but_kept() {
        let f = fixture();
        f.session.login("did:iota:me", "not-a-jwt").await.unwrap();

        assert!(!f.session.check_expiry().await.unwrap());
        assert!(f.session.current().await.unwrap().is_some());
        assert_eq!(
            *f.messages.0.lock().unwrap(),
            vec![JWT_UNREADABLE_MESSAGE.to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_watch_runs_on_interval() {
        let f = fixture();
        let past = Utc::now().timestamp() - 10;
        f.session
            .login("did:iota:me", jwt_expiring_at(past))
            .await
            .unwrap();

        f.session.start_expiry_watch();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(f.session.current().await.unwrap().is_some());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(f.session.current().await.unwrap().is_none());
        f.session.stop_expiry_watch();
        f.session.stop_expiry_watch();
    }
}
