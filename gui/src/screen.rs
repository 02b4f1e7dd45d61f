//! State of the post list screen.
//!
//! The screen owns its posts and its search term. Its fetcher is passed in
//! when it is built and its preference store once that is open.
//!
//! At most one fetch is in flight per screen. A refresh requested while one
//! is pending is ignored, and the pending fetch is the one whose result
//! lands. Disposing the screen aborts the pending fetch, and any result that
//! still arrives is dropped.

use database::SearchPreference;
use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use postboard_core::{group_posts, CoreError, ErrorExt, ErrorReporter, Post, PostGroup};
use posts_client::PostFetcher;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    /// Holds the message shown to the user.
    Failed(String),
}

/// Result of one fetch, tagged with the request that produced it.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub request_id: u64,
    pub result: Result<Vec<Post>, Arc<CoreError>>,
}

/// A fetch that has been admitted by the screen but not yet run.
pub struct FetchTask {
    request_id: u64,
    fetcher: Arc<dyn PostFetcher>,
    registration: AbortRegistration,
}

impl FetchTask {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub async fn run(self) -> FetchOutcome {
        let FetchTask {
            request_id,
            fetcher,
            registration,
        } = self;

        let fetch = Abortable::new(async move { fetcher.fetch_posts().await }, registration);
        let result = match fetch.await {
            Ok(result) => result.map_err(Arc::new),
            Err(Aborted) => {
                debug!("Fetch {} aborted", request_id);
                Err(Arc::new(CoreError::Cancelled {
                    operation: "fetch posts".to_string(),
                }))
            }
        };

        FetchOutcome { request_id, result }
    }
}

impl std::fmt::Debug for FetchTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchTask")
            .field("request_id", &self.request_id)
            .finish()
    }
}

struct InFlight {
    request_id: u64,
    abort: AbortHandle,
}

pub struct HomeScreen {
    posts: Vec<Post>,
    search: String,
    search_edited: bool,
    load_state: LoadState,
    in_flight: Option<InFlight>,
    next_request_id: u64,
    disposed: bool,
    fetcher: Arc<dyn PostFetcher>,
    preference: Option<SearchPreference>,
    reporter: ErrorReporter,
}

impl HomeScreen {
    pub fn new(fetcher: Arc<dyn PostFetcher>) -> Self {
        Self {
            posts: Vec::new(),
            search: String::new(),
            search_edited: false,
            load_state: LoadState::Idle,
            in_flight: None,
            next_request_id: 0,
            disposed: false,
            fetcher,
            preference: None,
            reporter: ErrorReporter::new(),
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Posts matching the current search, grouped by author.
    pub fn grouped(&self) -> Vec<PostGroup> {
        group_posts(&self.posts, &self.search)
    }

    /// Admits a new fetch, or returns `None` if one is already pending or
    /// the screen has been disposed.
    pub fn begin_fetch(&mut self) -> Option<FetchTask> {
        if self.disposed {
            debug!("Fetch requested on a disposed screen, ignoring");
            return None;
        }
        if let Some(in_flight) = &self.in_flight {
            debug!(
                "Fetch {} still pending, ignoring refresh",
                in_flight.request_id
            );
            return None;
        }

        self.next_request_id += 1;
        let request_id = self.next_request_id;
        let (abort, registration) = AbortHandle::new_pair();

        self.in_flight = Some(InFlight { request_id, abort });
        self.load_state = LoadState::Loading;
        info!("Starting fetch {}", request_id);

        Some(FetchTask {
            request_id,
            fetcher: Arc::clone(&self.fetcher),
            registration,
        })
    }

    /// Applies a fetch result. Returns false when the result was dropped
    /// because it does not belong to the pending fetch.
    pub fn finish_fetch(&mut self, outcome: FetchOutcome) -> bool {
        let pending = self.in_flight.as_ref().map(|f| f.request_id);
        if self.disposed || pending != Some(outcome.request_id) {
            debug!(
                "Dropping result of fetch {} (pending: {:?})",
                outcome.request_id, pending
            );
            return false;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(posts) => {
                info!("Fetch {} loaded {} posts", outcome.request_id, posts.len());
                self.posts = posts;
                self.load_state = LoadState::Loaded;
            }
            Err(e) => {
                // Keep whatever was shown before.
                self.reporter.report_error(&e);
                self.load_state = LoadState::Failed(e.user_friendly_message());
            }
        }
        true
    }

    /// Updates the search term and queues it for persisting without waiting.
    /// Writes land in the order the terms were typed.
    pub fn set_search(&mut self, value: String) {
        self.search_edited = true;
        if value == self.search {
            return;
        }
        self.search = value;

        if let Some(preference) = &self.preference {
            preference.save_in_background(self.search.clone());
        }
    }

    /// Hands the screen its preference store along with the term restored
    /// from it. The restored term is applied only if the user has not typed
    /// yet; otherwise the current term is written back instead.
    pub fn attach_preference(&mut self, preference: SearchPreference, restored: Option<String>) {
        if self.search_edited {
            debug!("Search edited before preferences were ready, keeping it");
            preference.save_in_background(self.search.clone());
        } else if let Some(term) = restored {
            self.search = term;
        }
        self.preference = Some(preference);
    }

    /// Aborts the pending fetch. Later results are dropped.
    pub fn dispose(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            debug!("Aborting fetch {}", in_flight.request_id);
            in_flight.abort.abort();
        }
        self.disposed = true;
    }
}

impl Drop for HomeScreen {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use database::{MemoryPreferenceStore, PreferenceStore};
    use postboard_core::{PostsApiError, SEARCH_TEXT_KEY};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    fn post(id: i64, user_id: i64, title: &str) -> Post {
        Post {
            id,
            user_id,
            title: title.to_string(),
            body: format!("body {}", id),
        }
    }

    fn sample_posts() -> Vec<Post> {
        vec![
            post(1, 5, "Apple pie"),
            post(2, 5, "Banana"),
            post(3, 9, "apple tart"),
        ]
    }

    struct StubFetcher {
        posts: Vec<Post>,
        fail_with: Option<PostsApiError>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn ok(posts: Vec<Post>) -> Arc<Self> {
            Arc::new(Self {
                posts,
                fail_with: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: PostsApiError) -> Arc<Self> {
            Arc::new(Self {
                posts: Vec::new(),
                fail_with: Some(error),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PostFetcher for StubFetcher {
        async fn fetch_posts(&self) -> Result<Vec<Post>, CoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(e) => Err(e.clone().into()),
                None => Ok(self.posts.clone()),
            }
        }
    }

    /// Fetcher that never completes until released.
    struct BlockedFetcher {
        release: Notify,
    }

    #[async_trait]
    impl PostFetcher for BlockedFetcher {
        async fn fetch_posts(&self) -> Result<Vec<Post>, CoreError> {
            self.release.notified().await;
            Ok(sample_posts())
        }
    }

    #[tokio::test]
    async fn test_fetch_loads_posts() {
        let fetcher = StubFetcher::ok(sample_posts());
        let mut screen = HomeScreen::new(fetcher.clone());
        assert_eq!(screen.load_state(), &LoadState::Idle);

        let task = screen.begin_fetch().unwrap();
        assert_eq!(screen.load_state(), &LoadState::Loading);
        assert!(screen.is_fetching());

        let outcome = task.run().await;
        assert!(screen.finish_fetch(outcome));
        assert_eq!(screen.load_state(), &LoadState::Loaded);
        assert_eq!(screen.posts().len(), 3);
        assert!(!screen.is_fetching());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_overlapping_refresh_is_ignored() {
        let fetcher = StubFetcher::ok(sample_posts());
        let mut screen = HomeScreen::new(fetcher.clone());

        let first = screen.begin_fetch().unwrap();
        assert!(screen.begin_fetch().is_none());
        assert!(screen.begin_fetch().is_none());

        let outcome = first.run().await;
        assert!(screen.finish_fetch(outcome));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        // Once settled, a new refresh is admitted with a fresh id.
        let second = screen.begin_fetch().unwrap();
        assert_eq!(second.request_id(), 2);
    }

    #[tokio::test]
    async fn test_stale_outcome_is_dropped() {
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));
        let task = screen.begin_fetch().unwrap();

        let stale = FetchOutcome {
            request_id: task.request_id() + 10,
            result: Ok(vec![post(99, 1, "stale")]),
        };
        assert!(!screen.finish_fetch(stale));
        assert!(screen.is_fetching());
        assert!(screen.posts().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_previous_posts() {
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));
        let outcome = screen.begin_fetch().unwrap().run().await;
        screen.finish_fetch(outcome);

        screen.fetcher = StubFetcher::failing(PostsApiError::HttpStatus { status_code: 500 });
        let outcome = screen.begin_fetch().unwrap().run().await;
        assert!(outcome.result.as_ref().unwrap_err().is_network_error());
        assert!(screen.finish_fetch(outcome));

        match screen.load_state() {
            LoadState::Failed(message) => assert!(message.contains("500")),
            other => panic!("Expected failed state, got {:?}", other),
        }
        assert_eq!(screen.posts().len(), 3);
    }

    #[tokio::test]
    async fn test_parse_error_surfaces_message() {
        let mut screen = HomeScreen::new(StubFetcher::failing(PostsApiError::InvalidResponse {
            details: "expected array".to_string(),
        }));
        let outcome = screen.begin_fetch().unwrap().run().await;
        assert!(outcome.result.as_ref().unwrap_err().is_parse_error());
        screen.finish_fetch(outcome);
        assert!(matches!(screen.load_state(), LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn test_dispose_aborts_pending_fetch() {
        let fetcher = Arc::new(BlockedFetcher {
            release: Notify::new(),
        });
        let mut screen = HomeScreen::new(fetcher.clone());
        let task = screen.begin_fetch().unwrap();
        let handle = tokio::spawn(task.run());

        screen.dispose();
        let outcome = handle.await.unwrap();

        assert!(matches!(
            outcome.result.as_ref().unwrap_err().as_ref(),
            CoreError::Cancelled { .. }
        ));
        assert!(!screen.finish_fetch(outcome));
        assert!(screen.posts().is_empty());
        assert!(screen.begin_fetch().is_none());
        assert!(screen.is_disposed());
    }

    #[tokio::test]
    async fn test_search_filters_grouped_view() {
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));
        let outcome = screen.begin_fetch().unwrap().run().await;
        screen.finish_fetch(outcome);

        assert_eq!(screen.grouped().len(), 2);
        screen.set_search("APPLE".to_string());
        let groups = screen.grouped();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].posts, vec![post(1, 5, "Apple pie")]);

        screen.set_search("nothing matches".to_string());
        assert!(screen.grouped().is_empty());
    }

    #[tokio::test]
    async fn test_restored_search_applies_when_untouched() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));

        screen.attach_preference(SearchPreference::new(store), Some("tart".to_string()));
        assert_eq!(screen.search(), "tart");
    }

    #[tokio::test]
    async fn test_typed_search_wins_over_restored() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));

        let preference = SearchPreference::new(store.clone());

        screen.set_search("pie".to_string());
        screen.attach_preference(preference.clone(), Some("tart".to_string()));
        assert_eq!(screen.search(), "pie");

        preference.flush().await;
        assert_eq!(
            store.get(SEARCH_TEXT_KEY).await.unwrap(),
            Some("pie".to_string())
        );
    }

    #[tokio::test]
    async fn test_search_changes_are_persisted() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));
        let preference = SearchPreference::new(store.clone());
        screen.attach_preference(preference.clone(), None);

        screen.set_search("banana".to_string());
        preference.flush().await;
        assert_eq!(
            store.get(SEARCH_TEXT_KEY).await.unwrap(),
            Some("banana".to_string())
        );
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_break_search() {
        let store = Arc::new(MemoryPreferenceStore::new());
        store.set_fail_writes(true);
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));
        screen.attach_preference(SearchPreference::new(store), None);
        let outcome = screen.begin_fetch().unwrap().run().await;
        screen.finish_fetch(outcome);

        screen.set_search("banana".to_string());
        assert_eq!(screen.search(), "banana");
        assert_eq!(screen.grouped().len(), 1);
    }

    /// Store that takes longer to write the first term than the later ones.
    struct SlowFirstWrite {
        inner: MemoryPreferenceStore,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl PreferenceStore for SlowFirstWrite {
        async fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
            if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            self.inner.set(key, value).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_typed_term_is_the_one_stored() {
        let store = Arc::new(SlowFirstWrite {
            inner: MemoryPreferenceStore::new(),
            writes: AtomicUsize::new(0),
        });
        let preference = SearchPreference::new(store.clone());
        let mut screen = HomeScreen::new(StubFetcher::ok(sample_posts()));
        screen.attach_preference(preference.clone(), None);

        for term in ["a", "ap", "app", "appl", "apple"] {
            screen.set_search(term.to_string());
        }
        preference.flush().await;

        assert_eq!(
            store.get(SEARCH_TEXT_KEY).await.unwrap(),
            Some("apple".to_string())
        );
    }
}
