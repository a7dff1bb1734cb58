//! Incremental search controller.
//!
//! Runs a user-initiated search against a paginated remote endpoint, one
//! page at a time, until a direct lookup answers, the caller's limit is met,
//! a short page signals the end of the data, or a newer search supersedes it.

use std::sync::{Arc, Mutex, MutexGuard};

use isdash_core::auth::AuthState;
use isdash_core::config::SearchSettings;
use isdash_core::error::{IsdashError, Result};
use isdash_core::notification::{Notification, NotificationSink};
use isdash_core::search::{
    InsertPosition, InsertionOrder, PageCriteria, PaginatedFetchService, QueryClassification,
    QueryClassifier, SearchEvent, SearchFilters, SearchOptions, SearchRecord, SearchRequest,
    SearchToken,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::state::{SearchControl, SearchState};
use crate::observable::{Observable, Subscription};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Outcome of one page as seen by the page loop.
enum PageStep {
    Continue(u32),
    Done,
}

/// Fluent builder for [`IncrementalSearchController`].
pub struct SearchControllerBuilder<S: PaginatedFetchService> {
    service: Arc<S>,
    auth: Arc<dyn AuthState>,
    classifier: Arc<dyn QueryClassifier>,
    settings: SearchSettings,
    notifier: Option<Arc<dyn NotificationSink>>,
    subject: &'static str,
}

impl<S: PaginatedFetchService + 'static> SearchControllerBuilder<S> {
    pub fn new(
        service: Arc<S>,
        auth: Arc<dyn AuthState>,
        classifier: Arc<dyn QueryClassifier>,
    ) -> Self {
        Self {
            service,
            auth,
            classifier,
            settings: SearchSettings::default(),
            notifier: None,
            subject: "record",
        }
    }

    pub fn with_settings(mut self, settings: SearchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Posts failures to `notifier` in addition to the event stream.
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Noun used in user-facing messages, e.g. "user" or "channel".
    pub fn with_subject(mut self, subject: &'static str) -> Self {
        self.subject = subject;
        self
    }

    pub fn build(self) -> IncrementalSearchController<S> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        IncrementalSearchController {
            inner: Arc::new(Inner {
                service: self.service,
                auth: self.auth,
                classifier: self.classifier,
                settings: self.settings.normalized(),
                notifier: self.notifier,
                subject: self.subject,
                control: Mutex::new(SearchControl::default()),
                results: Observable::new(Vec::new()),
                loading: Observable::new(false),
                events,
            }),
        }
    }
}

/// Handle to a search running in the background.
pub struct SearchHandle {
    token: SearchToken,
    task: JoinHandle<()>,
}

impl SearchHandle {
    pub fn token(&self) -> SearchToken {
        self.token
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the page loop to reach a terminal state.
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| IsdashError::internal(format!("search task failed: {}", e)))
    }
}

/// Cancelable, sequential page-by-page search feeding an observable result set.
///
/// One instance owns its state exclusively; run one per searchable
/// collection (identities, channels) so searches never contaminate each other.
pub struct IncrementalSearchController<S: PaginatedFetchService> {
    inner: Arc<Inner<S>>,
}

impl<S: PaginatedFetchService> Clone for IncrementalSearchController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct Inner<S: PaginatedFetchService> {
    service: Arc<S>,
    auth: Arc<dyn AuthState>,
    classifier: Arc<dyn QueryClassifier>,
    settings: SearchSettings,
    notifier: Option<Arc<dyn NotificationSink>>,
    subject: &'static str,
    /// Results and loading are only written while this lock is held.
    control: Mutex<SearchControl>,
    results: Observable<Vec<S::Record>>,
    loading: Observable<bool>,
    events: broadcast::Sender<SearchEvent>,
}

impl<S: PaginatedFetchService + 'static> IncrementalSearchController<S> {
    pub fn builder(
        service: Arc<S>,
        auth: Arc<dyn AuthState>,
        classifier: Arc<dyn QueryClassifier>,
    ) -> SearchControllerBuilder<S> {
        SearchControllerBuilder::new(service, auth, classifier)
    }

    /// Starts a search in the background, superseding any search in flight.
    ///
    /// # Errors
    /// `IsdashError::Unauthenticated` when the caller is not authenticated;
    /// nothing is fetched and the current state is left untouched.
    pub fn start(&self, query: impl Into<String>, options: SearchOptions) -> Result<SearchHandle> {
        let request = self.inner.begin(query.into(), options)?;
        let token = request.token;
        let inner = self.inner.clone();
        let task = tokio::spawn(async move { inner.run_pages(request).await });
        Ok(SearchHandle { token, task })
    }

    /// Like [`start`](Self::start), but drives the page loop on the calling
    /// task and returns once the invocation is over.
    pub async fn run(&self, query: impl Into<String>, options: SearchOptions) -> Result<()> {
        let request = self.inner.begin(query.into(), options)?;
        self.inner.run_pages(request).await;
        Ok(())
    }

    /// Halts the current search. Results fetched so far stay visible.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Returns the controller to its freshly built state.
    pub fn reset(&self) {
        {
            let mut control = self.inner.lock_control();
            let last_token = control.last_token;
            *control = SearchControl {
                last_token,
                ..SearchControl::default()
            };
            self.inner.results.store(Vec::new());
            self.inner.loading.store(false);
        }
        self.inner.results.notify();
        self.inner.loading.notify();
    }

    pub fn results(&self) -> Vec<S::Record> {
        self.inner.results.get()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.get()
    }

    pub fn state(&self) -> SearchState<S::Record> {
        let control = self.inner.lock_control();
        SearchState {
            current_token: control.current_token,
            page_index: control.page_index,
            is_halted: control.is_halted,
            is_loading: self.inner.loading.get(),
            accumulated_results: self.inner.results.get(),
        }
    }

    pub fn on_results_changed(
        &self,
        listener: impl Fn(&Vec<S::Record>) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.results.subscribe(listener)
    }

    pub fn on_loading_changed(&self, listener: impl Fn(&bool) + Send + Sync + 'static) -> Subscription {
        self.inner.loading.subscribe(listener)
    }

    pub fn watch_results(&self) -> tokio::sync::watch::Receiver<Vec<S::Record>> {
        self.inner.results.watch()
    }

    pub fn watch_loading(&self) -> tokio::sync::watch::Receiver<bool> {
        self.inner.loading.watch()
    }

    pub fn events(&self) -> broadcast::Receiver<SearchEvent> {
        self.inner.events.subscribe()
    }

    /// Replaces the record sharing `record`'s id, if it is in the result set.
    pub fn update_record(&self, record: S::Record) -> bool {
        let replaced = {
            let _control = self.inner.lock_control();
            let position = self
                .inner
                .results
                .with(|results| results.iter().position(|r| r.record_id() == record.record_id()));
            match position {
                Some(index) => {
                    self.inner.results.modify(|results| results[index] = record);
                    true
                }
                None => false,
            }
        };
        if replaced {
            self.inner.results.notify();
        }
        replaced
    }

    /// Fetches one record by identifier and adds it to the result set.
    ///
    /// # Errors
    /// `Unauthenticated`, `NotFound` or `Transport`; each is also posted to
    /// the notifier.
    pub async fn add_by_identifier(&self, id: &str, position: InsertPosition) -> Result<S::Record> {
        if !self.inner.auth.is_authenticated() {
            self.inner.notify(Notification::error(IsdashError::Unauthenticated.to_string()));
            return Err(IsdashError::Unauthenticated);
        }

        let record = match self.inner.service.fetch_by_identifier(id).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(id, error = %e, "add_by_identifier: lookup failed");
                self.inner.notify(Notification::error(format!(
                    "There was an error fetching {} information",
                    self.inner.subject
                )));
                return Err(e);
            }
        };

        {
            let _control = self.inner.lock_control();
            let inserted = record.clone();
            self.inner.results.modify(move |results| match position {
                InsertPosition::Front => results.insert(0, inserted),
                InsertPosition::Back => results.push(inserted),
            });
        }
        self.inner.results.notify();
        Ok(record)
    }
}

impl<S: PaginatedFetchService> Inner<S> {
    fn lock_control(&self) -> MutexGuard<'_, SearchControl> {
        self.control
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SearchEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn notify(&self, notification: Notification) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(notification);
        }
    }

    fn report_unauthenticated(&self, query: &str) {
        tracing::warn!(query, "search rejected: not authenticated");
        self.emit(SearchEvent::Unauthenticated {
            query: query.to_string(),
        });
        self.notify(Notification::error(IsdashError::Unauthenticated.to_string()));
    }

    /// Cancels whatever is in flight and opens a new invocation.
    fn begin(&self, query: String, options: SearchOptions) -> Result<SearchRequest> {
        if !self.auth.is_authenticated() {
            self.report_unauthenticated(&query);
            return Err(IsdashError::Unauthenticated);
        }

        let SearchOptions { limit, filters } = options;
        let token = {
            let mut control = self.lock_control();
            control.halt();
            let token = control.mint();
            self.results.store(Vec::new());
            self.loading.store(true);
            token
        };
        self.results.notify();
        self.loading.notify();

        tracing::info!(%token, query = %query, ?limit, "search started");
        self.emit(SearchEvent::Started {
            token,
            query: query.clone(),
        });

        Ok(SearchRequest {
            query,
            filters,
            page_size: limit.unwrap_or(self.settings.page_size).max(1),
            limit,
            token,
        })
    }

    fn stop(&self) {
        let was_loading = {
            let mut control = self.lock_control();
            control.halt();
            control.current_token = None;
            let was_loading = self.loading.get();
            self.loading.store(false);
            was_loading
        };
        // A repeated stop is a no-op for listeners.
        if was_loading {
            self.loading.notify();
        }
    }

    async fn run_pages(&self, request: SearchRequest) {
        let classification = self.classifier.classify(&request.query);
        let mut page_index = 0;

        loop {
            if !self.lock_control().is_current(request.token) {
                tracing::debug!(token = %request.token, "search superseded before page {}", page_index);
                return;
            }
            if !self.auth.is_authenticated() {
                self.terminate_unauthenticated(&request);
                return;
            }

            let step = match &classification {
                QueryClassification::Lookup(id) => {
                    self.lookup(&request, id).await;
                    PageStep::Done
                }
                listing => self.listing_page(&request, listing, page_index).await,
            };

            match step {
                PageStep::Continue(next) => {
                    page_index = next;
                    if let Some(delay) = self.settings.page_delay() {
                        tokio::time::sleep(delay).await;
                    }
                }
                PageStep::Done => return,
            }
        }
    }

    async fn listing_page(
        &self,
        request: &SearchRequest,
        classification: &QueryClassification,
        page_index: u32,
    ) -> PageStep {
        // The caller's limit sizes and judges the opening page only.
        let opening = page_index == 0;
        let page_size = if opening {
            request.page_size
        } else {
            self.settings.page_size
        };
        let criteria = page_criteria(
            classification,
            &request.filters,
            page_index,
            page_size,
            self.settings.sort_descending,
        );

        tracing::debug!(token = %request.token, page_index, page_size, "fetching page");
        let fetched = self.service.fetch_page(&criteria).await;

        let (records, failure) = match fetched {
            Ok(records) => (records, None),
            Err(IsdashError::Unauthenticated) => {
                if self.lock_control().is_current(request.token) {
                    self.terminate_unauthenticated(request);
                }
                return PageStep::Done;
            }
            Err(e) => (Vec::new(), Some(e)),
        };
        let fetched_len = records.len();

        let (step, total) = {
            let mut control = self.lock_control();
            if !control.is_current(request.token) {
                tracing::debug!(token = %request.token, page_index, "dropping superseded page");
                return PageStep::Done;
            }

            if !records.is_empty() {
                let order = self.settings.insertion_order;
                self.results.modify(move |results| merge(results, records, order));
            }
            let total = self.results.with(Vec::len);

            let wants_more = match request.limit {
                Some(limit) if opening => total < limit,
                _ => fetched_len == page_size,
            };
            if !control.is_halted && wants_more {
                control.page_index += 1;
                (PageStep::Continue(control.page_index), total)
            } else {
                control.halt();
                self.loading.store(false);
                (PageStep::Done, total)
            }
        };

        if let Some(e) = failure {
            tracing::warn!(query = %request.query, page_index, error = %e, "search page failed");
            self.emit(SearchEvent::SearchPageFailed {
                query: request.query.clone(),
                page_index,
                message: e.to_string(),
            });
            self.notify(Notification::error(format!(
                "There was an error searching for {}",
                self.subject
            )));
        }

        if fetched_len > 0 {
            self.results.notify();
            self.emit(SearchEvent::PageLoaded {
                token: request.token,
                page_index,
                records: fetched_len,
            });
        }
        if let PageStep::Done = step {
            self.finish(request.token, total);
        }
        step
    }

    async fn lookup(&self, request: &SearchRequest, id: &str) {
        tracing::debug!(token = %request.token, id, "identifier lookup");
        let outcome = self.service.fetch_by_identifier(id).await;

        let total = {
            let mut control = self.lock_control();
            if !control.is_current(request.token) {
                tracing::debug!(token = %request.token, "dropping superseded lookup");
                return;
            }
            let results = match &outcome {
                Ok(record) => vec![record.clone()],
                Err(_) => Vec::new(),
            };
            let total = results.len();
            self.results.store(results);
            control.halt();
            self.loading.store(false);
            total
        };
        self.results.notify();

        match outcome {
            Ok(_) => self.emit(SearchEvent::PageLoaded {
                token: request.token,
                page_index: 0,
                records: 1,
            }),
            Err(e) if e.is_not_found() => {
                tracing::debug!(id, "identifier lookup found nothing");
            }
            Err(IsdashError::Unauthenticated) => self.report_unauthenticated(&request.query),
            Err(e) => {
                tracing::warn!(id, error = %e, "identifier lookup failed");
                self.emit(SearchEvent::SearchPageFailed {
                    query: request.query.clone(),
                    page_index: 0,
                    message: e.to_string(),
                });
                self.notify(Notification::error(format!(
                    "There was an error searching for {}",
                    self.subject
                )));
            }
        }
        self.finish(request.token, total);
    }

    fn terminate_unauthenticated(&self, request: &SearchRequest) {
        {
            let mut control = self.lock_control();
            control.halt();
            self.loading.store(false);
        }
        self.report_unauthenticated(&request.query);
        let total = self.results.with(Vec::len);
        self.finish(request.token, total);
    }

    fn finish(&self, token: SearchToken, total: usize) {
        self.loading.notify();
        tracing::info!(%token, total, "search finished");
        self.emit(SearchEvent::Finished { token, total });
    }
}

fn merge<R>(results: &mut Vec<R>, page: Vec<R>, order: InsertionOrder) {
    match order {
        InsertionOrder::Append => results.extend(page),
        InsertionOrder::Prepend => {
            let earlier = std::mem::replace(results, page);
            results.extend(earlier);
        }
    }
}

fn page_criteria(
    classification: &QueryClassification,
    filters: &SearchFilters,
    page_index: u32,
    page_size: usize,
    sort_descending: bool,
) -> PageCriteria {
    let non_empty = |q: &String| Some(q.clone()).filter(|q| !q.is_empty());
    let mut criteria = PageCriteria {
        owner_filter: filters.owner().map(str::to_string),
        extra_filters: filters
            .extra()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        page_index,
        page_size,
        sort_descending,
        ..PageCriteria::default()
    };
    match classification {
        QueryClassification::IdentifierListing(id) => criteria.identifier_query = non_empty(id),
        QueryClassification::FreeText(q) => criteria.free_text_query = non_empty(q),
        QueryClassification::TypeName(t) => criteria.type_query = non_empty(t),
        QueryClassification::Lookup(_) => {}
    }
    criteria
}
