//! Wiring shared by the commands.

use anyhow::{Context as _, Result};
use isdash_application::{DashboardSession, NotificationCenter, SessionScoped, Subscription};
use isdash_core::auth::AuthRepository;
use isdash_core::config::DashboardConfig;
use isdash_core::notification::{NotificationKind, NotificationSink};
use isdash_infrastructure::{ConfigService, FileAuthStore, IsApiClient};
use std::sync::{Arc, Mutex};

pub struct Context {
    pub config: DashboardConfig,
    pub auth: Arc<FileAuthStore>,
    pub client: Arc<IsApiClient>,
    pub notifications: NotificationCenter,
    _printer: Subscription,
}

impl Context {
    pub async fn load() -> Result<Self> {
        let config = ConfigService::default()
            .get_config()
            .context("Failed to load configuration")?;
        let auth = Arc::new(
            FileAuthStore::open_default(None)
                .await
                .context("Failed to open auth store")?,
        );
        let client = Arc::new(
            IsApiClient::new(&config.api)?.with_auth(auth.clone() as Arc<dyn AuthRepository>),
        );
        let notifications = NotificationCenter::new(&config.notifications);
        let printer = print_new_notifications(&notifications);

        Ok(Self {
            config,
            auth,
            client,
            notifications,
            _printer: printer,
        })
    }

    /// A session whose logout clears `scoped`.
    pub fn session(&self, scoped: Vec<Arc<dyn SessionScoped>>) -> DashboardSession {
        DashboardSession::new(
            self.auth.clone(),
            scoped,
            Some(Arc::new(self.notifications.clone()) as Arc<dyn NotificationSink>),
            self.config.search.clone(),
            self.config.auth.clone(),
        )
    }
}

/// Echoes every notification to stderr once.
fn print_new_notifications(center: &NotificationCenter) -> Subscription {
    let printed = Mutex::new(Vec::<String>::new());
    center.subscribe(move |list| {
        let mut printed = printed.lock().unwrap_or_else(|e| e.into_inner());
        for n in list {
            let Some(id) = &n.id else { continue };
            if printed.contains(id) {
                continue;
            }
            printed.push(id.clone());
            match n.kind {
                NotificationKind::Error => eprintln!("error: {}", n.message),
                NotificationKind::Info => eprintln!("{}", n.message),
            }
        }
    })
}
