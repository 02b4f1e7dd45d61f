use crate::{Database, MemoryPreferenceStore, PreferenceStore};
use postboard_core::{CoreError, ErrorExt, SEARCH_TEXT_KEY};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The persisted last search term.
///
/// Reads and background writes never fail the caller: a broken store only
/// means the term is not remembered across sessions.
///
/// Background writes go through a single writer task per preference (shared
/// by its clones). Terms queued while a write is running collapse into the
/// newest one, so the stored value always ends on the last term queued.
#[derive(Clone)]
pub struct SearchPreference {
    store: Arc<dyn PreferenceStore>,
    writer: Arc<Writer>,
}

#[derive(Debug, Clone, Default)]
struct Queued {
    seq: u64,
    value: Option<String>,
}

struct Writer {
    queued: watch::Sender<Queued>,
    written: watch::Receiver<u64>,
    /// Held until the writer task is spawned on first use.
    idle: Mutex<Option<watch::Sender<u64>>>,
}

impl Writer {
    fn new() -> Self {
        let (queued, _) = watch::channel(Queued::default());
        let (written_tx, written) = watch::channel(0);
        Self {
            queued,
            written,
            idle: Mutex::new(Some(written_tx)),
        }
    }

    fn take_idle(&self) -> Option<watch::Sender<u64>> {
        match self.idle.lock() {
            Ok(mut idle) => idle.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

impl SearchPreference {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            store,
            writer: Arc::new(Writer::new()),
        }
    }

    /// Last saved term, or `None` when absent or unreadable.
    pub async fn load(&self) -> Option<String> {
        match self.store.get(SEARCH_TEXT_KEY).await {
            Ok(value) => {
                debug!("Restored search term: {:?}", value);
                value
            }
            Err(e) => {
                debug!("Could not restore search term");
                e.log_warn();
                None
            }
        }
    }

    pub async fn save(&self, value: &str) -> Result<(), CoreError> {
        self.store.set(SEARCH_TEXT_KEY, value).await
    }

    /// Queues the term for the writer task and returns immediately. Failures
    /// are logged and dropped. Returns false without queueing when called
    /// outside a tokio runtime.
    pub fn save_in_background(&self, value: String) -> bool {
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No async runtime available, search term not persisted");
                return false;
            }
        };

        if let Some(written) = self.writer.take_idle() {
            debug!("Starting search term writer");
            runtime.spawn(write_latest(
                Arc::clone(&self.store),
                self.writer.queued.subscribe(),
                written,
            ));
        }

        self.writer.queued.send_modify(|queued| {
            queued.seq += 1;
            queued.value = Some(value);
        });
        true
    }

    /// Waits until every term queued so far has been written or has failed.
    pub async fn flush(&self) {
        let target = self.writer.queued.borrow().seq;
        let mut written = self.writer.written.clone();
        if written.wait_for(|seq| *seq >= target).await.is_err() {
            debug!("Search term writer stopped before flush completed");
        }
    }
}

/// Writes the newest queued term, one write at a time, until every handle
/// to the preference is gone.
async fn write_latest(
    store: Arc<dyn PreferenceStore>,
    mut queued: watch::Receiver<Queued>,
    written: watch::Sender<u64>,
) {
    while queued.changed().await.is_ok() {
        let Queued { seq, value } = queued.borrow_and_update().clone();

        if let Some(value) = value {
            if let Err(e) = store.set(SEARCH_TEXT_KEY, &value).await {
                warn!("Search term not persisted ({}): {}", e.error_code(), e);
            }
        }
        written.send_replace(seq);
    }
    debug!("Search term writer finished");
}

impl std::fmt::Debug for SearchPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchPreference")
            .field("key", &SEARCH_TEXT_KEY)
            .finish()
    }
}

/// Opens the SQLite store at `database_url` for the search term. When the
/// store cannot be opened the session falls back to an in-memory store, so
/// search keeps working without being remembered.
pub async fn open_search_preference(database_url: &str) -> SearchPreference {
    let mut database = Database::new(database_url.to_string());

    let opened = match database.connect().await {
        Ok(()) => database.run_migrations().await,
        Err(e) => Err(e),
    };

    match opened {
        Ok(()) => SearchPreference::new(Arc::new(database)),
        Err(e) => {
            e.log_error();
            info!("Falling back to in-memory preferences for this session");
            SearchPreference::new(Arc::new(MemoryPreferenceStore::new()))
        }
    }
}
