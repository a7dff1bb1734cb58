use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use isdash_core::auth::StaticAuthState;
use isdash_core::config::SearchSettings;
use isdash_core::error::{IsdashError, Result};
use isdash_core::identity::Identity;
use isdash_core::notification::{Notification, NotificationSink};
use isdash_core::search::{
    IdentityQueryClassifier, InsertPosition, InsertionOrder, PageCriteria, PaginatedFetchService,
    QueryClassification, SearchEvent, SearchFilters, SearchOptions,
};
use tokio::sync::Notify;

use super::IncrementalSearchController;

// Mock directory returning scripted pages and recording every request
#[derive(Default)]
struct ScriptedDirectory {
    pages: Mutex<VecDeque<Result<Vec<Identity>>>>,
    lookup: Mutex<Option<Result<Identity>>>,
    page_calls: Mutex<Vec<PageCriteria>>,
    lookup_calls: Mutex<Vec<String>>,
    /// Requests for the free text "slow" wait here until released
    gate: Notify,
    entered: Notify,
}

impl ScriptedDirectory {
    fn with_pages(pages: Vec<Result<Vec<Identity>>>) -> Arc<Self> {
        let directory = Self::default();
        *directory.pages.lock().unwrap() = pages.into();
        Arc::new(directory)
    }

    fn with_lookup(result: Result<Identity>) -> Arc<Self> {
        let directory = Self::default();
        *directory.lookup.lock().unwrap() = Some(result);
        Arc::new(directory)
    }

    fn page_calls(&self) -> Vec<PageCriteria> {
        self.page_calls.lock().unwrap().clone()
    }

    fn lookup_calls(&self) -> Vec<String> {
        self.lookup_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaginatedFetchService for ScriptedDirectory {
    type Record = Identity;

    async fn fetch_page(&self, criteria: &PageCriteria) -> Result<Vec<Identity>> {
        self.page_calls.lock().unwrap().push(criteria.clone());
        if criteria.free_text_query.as_deref() == Some("slow") {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_by_identifier(&self, id: &str) -> Result<Identity> {
        self.lookup_calls.lock().unwrap().push(id.to_string());
        self.lookup
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(IsdashError::not_found("identity", id)))
    }
}

#[derive(Default)]
struct RecordingSink {
    shown: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    fn messages(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.message.clone())
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) -> String {
        let mut shown = self.shown.lock().unwrap();
        shown.push(notification);
        shown.len().to_string()
    }
}

struct Fixture {
    directory: Arc<ScriptedDirectory>,
    auth: Arc<StaticAuthState>,
    sink: Arc<RecordingSink>,
    controller: IncrementalSearchController<ScriptedDirectory>,
}

fn fixture(directory: Arc<ScriptedDirectory>, settings: SearchSettings) -> Fixture {
    let auth = Arc::new(StaticAuthState::new(true));
    let sink = Arc::new(RecordingSink::default());
    let controller = IncrementalSearchController::builder(
        directory.clone(),
        auth.clone(),
        Arc::new(IdentityQueryClassifier),
    )
    .with_settings(settings)
    .with_notifier(sink.clone())
    .with_subject("user")
    .build();
    Fixture {
        directory,
        auth,
        sink,
        controller,
    }
}

fn settings(page_size: usize) -> SearchSettings {
    SearchSettings {
        page_size,
        ..SearchSettings::default()
    }
}

fn users(ids: &[&str]) -> Vec<Identity> {
    ids.iter()
        .map(|id| Identity::new(*id).with_username(*id))
        .collect()
}

fn ids(records: &[Identity]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<SearchEvent>) -> Vec<SearchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_limit_sizes_opening_page_then_full_pages_continue() {
    let directory = ScriptedDirectory::with_pages(vec![
        Ok(users(&["a1", "a2"])),
        Ok(users(&["a3", "a4"])),
        Ok(Vec::new()),
    ]);
    let f = fixture(directory, settings(2));

    f.controller
        .run("alice", SearchOptions::new().with_limit(3))
        .await
        .unwrap();

    let calls = f.directory.page_calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls.iter().map(|c| c.page_size).collect::<Vec<_>>(),
        vec![3, 2, 2]
    );
    assert_eq!(
        calls.iter().map(|c| c.page_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert!(calls
        .iter()
        .all(|c| c.free_text_query.as_deref() == Some("alice")));
    assert_eq!(ids(&f.controller.results()), vec!["a1", "a2", "a3", "a4"]);

    let state = f.controller.state();
    assert!(state.is_halted);
    assert!(!state.is_loading);
    assert_eq!(state.page_index, 0);
}

#[tokio::test]
async fn test_opening_page_meeting_limit_stops() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a", "b", "c"]))]);
    let f = fixture(directory, settings(2));

    f.controller
        .run("a", SearchOptions::new().with_limit(3))
        .await
        .unwrap();

    assert_eq!(f.directory.page_calls().len(), 1);
    assert_eq!(f.controller.results().len(), 3);
}

#[tokio::test]
async fn test_short_page_ends_search() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a", "b"])), Ok(users(&["c"]))]);
    let f = fixture(directory, settings(2));

    f.controller.run("x", SearchOptions::new()).await.unwrap();

    assert_eq!(f.directory.page_calls().len(), 2);
    assert_eq!(ids(&f.controller.results()), vec!["a", "b", "c"]);
    assert!(!f.controller.is_loading());
}

#[tokio::test]
async fn test_did_query_is_single_lookup() {
    let directory = ScriptedDirectory::with_lookup(Ok(Identity::new("did:iota:xyz")));
    let f = fixture(directory, settings(2));

    f.controller
        .run("did:iota:xyz", SearchOptions::new())
        .await
        .unwrap();

    assert_eq!(f.directory.lookup_calls(), vec!["did:iota:xyz"]);
    assert!(f.directory.page_calls().is_empty());
    assert_eq!(ids(&f.controller.results()), vec!["did:iota:xyz"]);
    assert!(f.controller.state().is_halted);
    assert!(!f.controller.is_loading());
}

#[tokio::test]
async fn test_lookup_not_found_is_silent_and_empty() {
    let directory = ScriptedDirectory::with_lookup(Err(IsdashError::not_found("identity", "x")));
    let f = fixture(directory, settings(2));

    f.controller
        .run("did:iota:missing", SearchOptions::new())
        .await
        .unwrap();

    assert!(f.controller.results().is_empty());
    assert!(f.sink.messages().is_empty());
    assert!(!f.controller.is_loading());
}

#[tokio::test]
async fn test_type_name_query_uses_type_filter_and_owner() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(Vec::new())]);
    let f = fixture(directory, settings(2));

    let options = SearchOptions::new().with_filters(SearchFilters::new().with_owner("did:iota:me"));
    f.controller.run("device", options).await.unwrap();

    let calls = f.directory.page_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].type_query.as_deref(), Some("device"));
    assert_eq!(calls[0].free_text_query, None);
    assert_eq!(calls[0].owner_filter.as_deref(), Some("did:iota:me"));
}

#[tokio::test]
async fn test_failed_page_is_reported_and_treated_as_empty() {
    let directory = ScriptedDirectory::with_pages(vec![
        Err(IsdashError::http_status(500, "boom")),
        Ok(users(&["b1", "b2"])),
        Ok(Vec::new()),
    ]);
    let f = fixture(directory, settings(2));
    let mut events = f.controller.events();

    f.controller
        .run("bob", SearchOptions::new().with_limit(5))
        .await
        .unwrap();

    assert_eq!(f.directory.page_calls().len(), 3);
    assert_eq!(ids(&f.controller.results()), vec!["b1", "b2"]);
    assert_eq!(
        f.sink.messages(),
        vec!["There was an error searching for user".to_string()]
    );

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        SearchEvent::SearchPageFailed { query, page_index: 0, .. } if query == "bob"
    )));
    assert!(matches!(
        events.last(),
        Some(SearchEvent::Finished { total: 2, .. })
    ));
}

#[tokio::test]
async fn test_unauthenticated_start_fetches_nothing_and_keeps_state() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a"]))]);
    let f = fixture(directory, settings(2));
    f.controller.run("a", SearchOptions::new()).await.unwrap();
    let before = f.controller.state();

    f.auth.set(false);
    let mut events = f.controller.events();
    let err = f
        .controller
        .run("b", SearchOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_unauthenticated());
    assert_eq!(f.directory.page_calls().len(), 1);
    assert_eq!(f.controller.state(), before);
    assert_eq!(
        f.sink.messages(),
        vec!["Cant perform action, user not authenticated".to_string()]
    );
    assert_eq!(
        drain(&mut events),
        vec![SearchEvent::Unauthenticated { query: "b".into() }]
    );
}

#[tokio::test]
async fn test_unauthenticated_page_error_terminates() {
    let directory = ScriptedDirectory::with_pages(vec![
        Ok(users(&["a", "b"])),
        Err(IsdashError::Unauthenticated),
        Ok(users(&["c", "d"])),
    ]);
    let f = fixture(directory, settings(2));

    f.controller.run("a", SearchOptions::new()).await.unwrap();

    assert_eq!(f.directory.page_calls().len(), 2);
    assert_eq!(ids(&f.controller.results()), vec!["a", "b"]);
    assert!(!f.controller.is_loading());
    assert_eq!(
        f.sink.messages(),
        vec!["Cant perform action, user not authenticated".to_string()]
    );
}

#[tokio::test]
async fn test_prepend_order_puts_newest_page_first() {
    let directory = ScriptedDirectory::with_pages(vec![
        Ok(users(&["a", "b"])),
        Ok(users(&["c"])),
    ]);
    let f = fixture(
        directory,
        SearchSettings {
            insertion_order: InsertionOrder::Prepend,
            ..settings(2)
        },
    );

    f.controller.run("x", SearchOptions::new()).await.unwrap();

    assert_eq!(ids(&f.controller.results()), vec!["c", "a", "b"]);
}

#[tokio::test]
async fn test_newer_search_drops_late_page_of_older_one() {
    let directory = ScriptedDirectory::with_pages(vec![
        Ok(users(&["fresh"])),
        Ok(users(&["stale1", "stale2"])),
    ]);
    let f = fixture(directory, settings(2));

    let first = f
        .controller
        .start("slow", SearchOptions::new())
        .unwrap();
    f.directory.entered.notified().await;

    // The second search consumes the first scripted page while the first waits.
    f.controller.run("quick", SearchOptions::new()).await.unwrap();
    f.directory.gate.notify_one();
    first.wait().await.unwrap();

    assert_eq!(ids(&f.controller.results()), vec!["fresh"]);
    assert_eq!(f.directory.page_calls().len(), 2);
    assert!(!f.controller.is_loading());
}

#[tokio::test]
async fn test_stop_discards_in_flight_page() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["late1", "late2"]))]);
    let f = fixture(directory, settings(2));

    let handle = f
        .controller
        .start("slow", SearchOptions::new())
        .unwrap();
    f.directory.entered.notified().await;
    assert!(f.controller.is_loading());

    f.controller.stop();
    assert!(!f.controller.is_loading());
    f.directory.gate.notify_one();
    handle.wait().await.unwrap();

    assert!(f.controller.results().is_empty());
    assert_eq!(f.directory.page_calls().len(), 1);
    assert!(f.controller.state().is_halted);
}

#[tokio::test]
async fn test_loading_listener_sees_transitions() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a"]))]);
    let f = fixture(directory, settings(2));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    let _sub = f
        .controller
        .on_loading_changed(move |loading| sink.lock().unwrap().push(*loading));
    f.controller.run("a", SearchOptions::new()).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![false, true, false]);
}

#[tokio::test]
async fn test_start_clears_previous_results() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a"])), Ok(users(&["b"]))]);
    let f = fixture(directory, settings(2));
    let snapshots = Arc::new(Mutex::new(Vec::new()));

    f.controller.run("first", SearchOptions::new()).await.unwrap();
    let sink = snapshots.clone();
    let _sub = f
        .controller
        .on_results_changed(move |results| sink.lock().unwrap().push(ids(results)));
    f.controller.run("second", SearchOptions::new()).await.unwrap();

    let snapshots = snapshots.lock().unwrap();
    assert_eq!(snapshots[0], vec!["a"]);
    assert!(snapshots[1].is_empty());
    assert_eq!(snapshots.last().unwrap(), &vec!["b".to_string()]);
}

#[tokio::test]
async fn test_update_record_and_add_by_identifier() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a", "b"])), Ok(Vec::new())]);
    *directory.lookup.lock().unwrap() = Some(Ok(Identity::new("c")));
    let f = fixture(directory, settings(2));
    f.controller.run("x", SearchOptions::new()).await.unwrap();

    let renamed = Identity::new("b").with_username("bobby");
    assert!(f.controller.update_record(renamed));
    assert!(!f.controller.update_record(Identity::new("zzz")));

    f.controller
        .add_by_identifier("c", InsertPosition::Front)
        .await
        .unwrap();

    let results = f.controller.results();
    assert_eq!(ids(&results), vec!["c", "a", "b"]);
    assert_eq!(results[2].username.as_deref(), Some("bobby"));
}

#[tokio::test]
async fn test_reset_returns_to_initial_state() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a"]))]);
    let f = fixture(directory, settings(2));
    f.controller.run("x", SearchOptions::new()).await.unwrap();

    f.controller.reset();

    let state = f.controller.state();
    assert!(state.accumulated_results.is_empty());
    assert_eq!(state.current_token, None);
    assert!(!state.is_loading);
    assert!(!state.is_halted);
}

#[tokio::test]
async fn test_tokens_increase_across_invocations() {
    let directory = ScriptedDirectory::with_pages(vec![]);
    let f = fixture(directory, settings(2));

    let first = f.controller.start("a", SearchOptions::new()).unwrap();
    let first_token = first.token();
    first.wait().await.unwrap();
    let second = f.controller.start("b", SearchOptions::new()).unwrap();

    assert!(second.token() > first_token);
    second.wait().await.unwrap();
}

#[tokio::test]
async fn test_repeated_stop_changes_nothing() {
    let directory = ScriptedDirectory::with_pages(vec![Ok(users(&["a"])), Ok(Vec::new())]);
    let f = fixture(directory, settings(2));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _sub = f
        .controller
        .on_loading_changed(move |loading| sink.lock().unwrap().push(*loading));

    // After a finished search
    f.controller.run("a", SearchOptions::new()).await.unwrap();
    f.controller.stop();
    let after_first = f.controller.state();
    let transitions = seen.lock().unwrap().len();
    f.controller.stop();

    assert_eq!(f.controller.state(), after_first);
    assert_eq!(seen.lock().unwrap().len(), transitions);

    // While a page is in flight
    let handle = f
        .controller
        .start("slow", SearchOptions::new())
        .unwrap();
    f.directory.entered.notified().await;
    f.controller.stop();
    let after_first = f.controller.state();
    let transitions = seen.lock().unwrap().clone();
    f.controller.stop();

    assert_eq!(f.controller.state(), after_first);
    assert_eq!(*seen.lock().unwrap(), transitions);
    assert_eq!(transitions.last(), Some(&false));

    f.directory.gate.notify_one();
    handle.wait().await.unwrap();
    assert_eq!(f.controller.results(), after_first.accumulated_results);
}

#[tokio::test]
async fn test_custom_identifier_prefix_is_single_lookup() {
    let directory = ScriptedDirectory::with_lookup(Ok(Identity::new("abc123")));
    let classifier = |query: &str| match query.strip_prefix("id:") {
        Some(id) => QueryClassification::Lookup(id.to_string()),
        None => QueryClassification::FreeText(query.to_string()),
    };
    let controller = IncrementalSearchController::builder(
        directory.clone(),
        Arc::new(StaticAuthState::new(true)),
        Arc::new(classifier),
    )
    .build();

    controller.run("id:abc123", SearchOptions::new()).await.unwrap();

    assert_eq!(directory.lookup_calls(), vec!["abc123"]);
    assert!(directory.page_calls().is_empty());
    assert_eq!(ids(&controller.results()), vec!["abc123"]);
    assert!(!controller.is_loading());
}
