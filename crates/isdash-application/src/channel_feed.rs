//! Live channel feed.
//!
//! Polls one channel at a fixed interval and keeps its messages newest first.
//! Each reader owns at most one poller; starting a new one cancels the old.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use isdash_core::auth::AuthState;
use isdash_core::channel::{ChannelData, ChannelReader, ReadWindow};
use isdash_core::config::FeedSettings;
use isdash_core::error::{IsdashError, Result};
use isdash_core::notification::{Notification, NotificationSink};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::observable::{Observable, Subscription};

struct Poller {
    address: String,
    cancel: CancellationToken,
}

struct FeedInner<R: ChannelReader> {
    reader: Arc<R>,
    auth: Arc<dyn AuthState>,
    notifier: Option<Arc<dyn NotificationSink>>,
    interval: Duration,
    messages: Observable<Vec<ChannelData>>,
    busy: Observable<bool>,
    reading: AtomicBool,
    /// Bumped on every start and stop; reads from an older generation are discarded.
    generation: AtomicU64,
    poller: Mutex<Option<Poller>>,
}

/// Periodic reader for a single channel.
pub struct ChannelFeedReader<R: ChannelReader> {
    inner: Arc<FeedInner<R>>,
}

impl<R: ChannelReader> Clone for ChannelFeedReader<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<R: ChannelReader + 'static> ChannelFeedReader<R> {
    pub fn new(
        reader: Arc<R>,
        auth: Arc<dyn AuthState>,
        notifier: Option<Arc<dyn NotificationSink>>,
        settings: &FeedSettings,
    ) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                reader,
                auth,
                notifier,
                interval: settings.interval(),
                messages: Observable::new(Vec::new()),
                busy: Observable::new(false),
                reading: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                poller: Mutex::new(None),
            }),
        }
    }

    /// Reads `address` right away, then keeps polling it every interval.
    ///
    /// # Errors
    /// Returns `Unauthenticated` without starting a poller. Other read
    /// failures are notified and polling starts anyway.
    pub async fn start_reading(&self, address: impl Into<String>) -> Result<()> {
        let address = address.into();
        self.stop_reading();
        if !self.inner.auth.is_authenticated() {
            self.inner.notify(&IsdashError::Unauthenticated.to_string());
            return Err(IsdashError::Unauthenticated);
        }
        let generation = self.inner.generation.load(Ordering::SeqCst);
        tracing::info!(address = %address, "start reading channel");

        // Installed before the first read so that a concurrent stop can cancel it.
        let cancel = CancellationToken::new();
        let previous = self.inner.lock_poller().replace(Poller {
            address: address.clone(),
            cancel: cancel.clone(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        if !self.inner.busy.get() {
            if let Err(IsdashError::Unauthenticated) =
                self.inner.read_once(&address, generation).await
            {
                self.inner.retire_poller(&cancel);
                return Err(IsdashError::Unauthenticated);
            }
        }
        if cancel.is_cancelled() {
            tracing::debug!(address = %address, "feed stopped during first read");
            return Ok(());
        }

        let inner = self.inner.clone();
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(Instant::now() + inner.interval, inner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!(address = %address, "channel poller cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Errors are already reported to the notifier.
                        let _ = inner.read_once(&address, generation).await;
                    }
                }
            }
        });
        Ok(())
    }

    /// Fetches messages newer than the newest one held and prepends them.
    ///
    /// Returns the number of new messages; zero when a read is already running.
    pub async fn read_once(&self, address: &str) -> Result<usize> {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        self.inner.read_once(address, generation).await
    }

    /// Cancels the poller and clears the messages. Safe to call repeatedly.
    pub fn stop_reading(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(poller) = self.inner.lock_poller().take() {
            tracing::info!(address = %poller.address, "stop reading channel");
            poller.cancel.cancel();
        }
        self.inner.messages.set(Vec::new());
    }

    /// Address currently being polled.
    pub fn address(&self) -> Option<String> {
        self.inner.lock_poller().as_ref().map(|p| p.address.clone())
    }

    pub fn messages(&self) -> Vec<ChannelData> {
        self.inner.messages.get()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.get()
    }

    pub fn on_messages_changed(
        &self,
        listener: impl Fn(&Vec<ChannelData>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.messages.subscribe(listener)
    }

    pub fn on_busy_changed(&self, listener: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.inner.busy.subscribe(listener)
    }

    pub fn watch_messages(&self) -> tokio::sync::watch::Receiver<Vec<ChannelData>> {
        self.inner.messages.watch()
    }
}

impl<R: ChannelReader> FeedInner<R> {
    fn lock_poller(&self) -> std::sync::MutexGuard<'_, Option<Poller>> {
        self.poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cancels `cancel` and drops the installed poller if it is still the one holding it.
    fn retire_poller(&self, cancel: &CancellationToken) {
        cancel.cancel();
        let mut poller = self.lock_poller();
        if poller.as_ref().is_some_and(|p| p.cancel.is_cancelled()) {
            poller.take();
        }
    }

    fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(Notification::error(message));
        }
    }

    fn next_window(&self) -> ReadWindow {
        let newest = self.messages.with(|m| m.first().map(|d| d.log.created));
        match newest {
            Some(created) => ReadWindow {
                start_date: Some(created + chrono::Duration::seconds(1)),
                end_date: Some(Utc::now()),
            },
            None => ReadWindow::default(),
        }
    }

    async fn read_once(&self, address: &str, generation: u64) -> Result<usize> {
        if !self.auth.is_authenticated() {
            self.notify(&IsdashError::Unauthenticated.to_string());
            return Err(IsdashError::Unauthenticated);
        }
        if self
            .reading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!(address, "channel busy, skipping read");
            return Ok(0);
        }
        self.busy.set(true);

        let window = self.next_window();
        let outcome = self.reader.read(address, window).await;

        self.reading.store(false, Ordering::SeqCst);
        self.busy.set(false);

        let mut fresh = match outcome {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::warn!(address, error = %e, "channel read failed");
                self.notify("There was an error reading channel");
                return Err(e);
            }
        };
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(address, "discarding read from a stopped feed");
            return Ok(0);
        }

        let count = fresh.len();
        if count > 0 {
            fresh.sort_by(|a, b| b.log.created.cmp(&a.log.created));
            self.messages.update(move |messages| {
                fresh.extend(messages.drain(..));
                *messages = fresh;
            });
            tracing::debug!(address, count, "new channel messages");
        }
        Ok(count)
    }
}
