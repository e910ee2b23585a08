//! Session context.
//!
//! One explicit object owns all mutable session state: the current tree
//! snapshot, the duration and rating maps, filter criteria, sort spec,
//! expansion and selection sets, facet bounds, and transient notices. No
//! ambient singletons; components receive the session as an `Arc`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::library::{
    filter_files, flatten_tree, move_many, scan, Bounds, Entry, FilterCriteria, FlatRow,
    MoveReport, SortSpec,
};
use crate::store::{KvStore, KEY_DURATIONS, KEY_MOVE_TARGETS, KEY_RATINGS};
use crate::vfs::DirHandle;

/// How long a transient notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(3);

/// Delay for the debounced search input.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

const MAX_MOVE_TARGETS: usize = 10;

/// A transient, auto-clearing user notice.
#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

/// An immutable tree snapshot produced by one scan.
#[derive(Clone)]
pub struct Snapshot {
    pub scan_id: Uuid,
    pub root: Arc<Entry>,
}

pub struct Session {
    store: Arc<dyn KvStore>,
    /// Directory capability the current library was scanned from.
    library_root: Mutex<Option<Arc<dyn DirHandle>>>,
    pub snapshot: Mutex<Option<Snapshot>>,
    pub durations: Mutex<HashMap<String, f64>>,
    pub ratings: Mutex<HashMap<String, u8>>,
    pub criteria: Mutex<FilterCriteria>,
    pub sort: Mutex<SortSpec>,
    pub expanded: Mutex<HashSet<String>>,
    pub selection: Mutex<HashSet<String>>,
    pub bounds: Mutex<Bounds>,
    notices: Mutex<Vec<Notice>>,
    /// Guard ensuring a single enrichment pass at a time.
    pub is_enriching: AtomicBool,
    search_debounce: Debouncer,
}

impl Session {
    /// Create a session, merging the persisted duration and rating caches.
    pub fn new(store: Arc<dyn KvStore>) -> Arc<Self> {
        let durations: HashMap<String, f64> = store
            .get(KEY_DURATIONS)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();
        let ratings: HashMap<String, u8> = store
            .get(KEY_RATINGS)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default();

        if !durations.is_empty() || !ratings.is_empty() {
            log::info!(
                "Loaded {} cached durations, {} ratings",
                durations.len(),
                ratings.len()
            );
        }

        Arc::new(Self {
            store,
            library_root: Mutex::new(None),
            snapshot: Mutex::new(None),
            durations: Mutex::new(durations),
            ratings: Mutex::new(ratings),
            criteria: Mutex::new(FilterCriteria::default()),
            sort: Mutex::new(SortSpec::default()),
            expanded: Mutex::new(HashSet::new()),
            selection: Mutex::new(HashSet::new()),
            bounds: Mutex::new(Bounds::default()),
            notices: Mutex::new(Vec::new()),
            is_enriching: AtomicBool::new(false),
            search_debounce: Debouncer::new(SEARCH_DEBOUNCE),
        })
    }

    /// Scan a directory capability and make it the current library.
    pub fn open_library(&self, root: Arc<dyn DirHandle>) {
        let tree = scan(root.clone());
        *self.library_root.lock().unwrap() = Some(root);
        self.install_snapshot(tree);
    }

    /// Re-scan the current library root, replacing the snapshot wholesale.
    pub fn rescan(&self) {
        let root = self.library_root.lock().unwrap().clone();
        if let Some(root) = root {
            self.install_snapshot(scan(root));
        }
    }

    /// Move entries into `target`, then reconcile: rescan the tree and drop
    /// the selection. One failed entry does not abort the rest.
    pub async fn relocate(&self, entries: Vec<Arc<Entry>>, target: Arc<dyn DirHandle>) -> MoveReport {
        let total = entries.len();
        let report = move_many(entries, target).await;

        if report.failed.is_empty() {
            self.push_notice(format!("Moved {} files", report.moved));
        } else {
            self.push_notice(format!(
                "Moved {} of {} files ({} failed)",
                report.moved,
                total,
                report.failed.len()
            ));
        }
        self.rescan();
        self.clear_selection();
        report
    }

    /// Install a freshly scanned tree as the current snapshot and recompute
    /// bounds (the duration max carries over so it can only widen).
    pub fn install_snapshot(&self, root: Arc<Entry>) {
        let scan_id = Uuid::new_v4();
        let files = root.collect_files();
        log::info!("Scan {} indexed {} files", scan_id, files.len());

        {
            let durations = self.durations.lock().unwrap();
            let mut bounds = self.bounds.lock().unwrap();
            let previous = *bounds;
            *bounds = Bounds::derive(&files, &durations, Some(&previous));
        }
        *self.snapshot.lock().unwrap() = Some(Snapshot { scan_id, root });
    }

    pub fn root(&self) -> Option<Arc<Entry>> {
        self.snapshot.lock().unwrap().as_ref().map(|s| s.root.clone())
    }

    pub fn find_entry(&self, id: &str) -> Option<Arc<Entry>> {
        self.root().and_then(|root| root.find(id))
    }

    /// The current filtered, sorted flat file list.
    pub fn filtered_files(&self) -> Vec<Arc<Entry>> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let criteria = self.criteria.lock().unwrap().clone();
        let sort = *self.sort.lock().unwrap();
        let durations = self.durations.lock().unwrap();
        let ratings = self.ratings.lock().unwrap();
        filter_files(&root, &criteria, &sort, &durations, &ratings)
    }

    /// The flattened tree view for windowed rendering.
    pub fn flattened(&self) -> Vec<FlatRow> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        let criteria = self.criteria.lock().unwrap().clone();
        let sort = *self.sort.lock().unwrap();
        let durations = self.durations.lock().unwrap();
        let ratings = self.ratings.lock().unwrap();
        let expanded = self.expanded.lock().unwrap();
        flatten_tree(&root, &criteria, &sort, &durations, &ratings, &expanded)
    }

    /// Merge a batch of computed durations and persist the map. Persistence
    /// failures degrade to a warning; the in-memory map is already updated.
    pub fn apply_durations(&self, batch: &[(String, f64)]) {
        if batch.is_empty() {
            return;
        }
        let json = {
            let mut durations = self.durations.lock().unwrap();
            for (id, secs) in batch {
                durations.insert(id.clone(), *secs);
            }
            serde_json::to_string(&*durations)
        };
        match json {
            Ok(json) => {
                if let Err(e) = self.store.put(KEY_DURATIONS, &json) {
                    log::warn!("Failed to persist durations: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize durations: {}", e),
        }
    }

    /// Widen the duration bound for a newly discovered duration.
    pub fn widen_duration_bound(&self, seconds: f64) {
        self.bounds.lock().unwrap().widen_duration(seconds);
    }

    /// Set a rating (clamped to 0-5) and persist the map immediately.
    pub fn set_rating(&self, id: &str, rating: u8) {
        let json = {
            let mut ratings = self.ratings.lock().unwrap();
            ratings.insert(id.to_string(), rating.min(5));
            serde_json::to_string(&*ratings)
        };
        match json {
            Ok(json) => {
                if let Err(e) = self.store.put(KEY_RATINGS, &json) {
                    log::warn!("Failed to persist ratings: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize ratings: {}", e),
        }
    }

    pub fn rating(&self, id: &str) -> u8 {
        self.ratings.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    /// Remember a relocation target shortcut (most recent first, capped).
    pub fn remember_move_target(&self, target: &str) {
        let mut targets = self.move_targets();
        targets.retain(|t| t != target);
        targets.insert(0, target.to_string());
        targets.truncate(MAX_MOVE_TARGETS);

        match serde_json::to_string(&targets) {
            Ok(json) => {
                if let Err(e) = self.store.put(KEY_MOVE_TARGETS, &json) {
                    log::warn!("Failed to persist move targets: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize move targets: {}", e),
        }
    }

    pub fn move_targets(&self) -> Vec<String> {
        self.store
            .get(KEY_MOVE_TARGETS)
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    /// Post a transient notice (auto-clears after [`NOTICE_TTL`]).
    pub fn push_notice(&self, message: impl Into<String>) {
        let message = message.into();
        log::info!("Notice: {}", message);
        self.notices.lock().unwrap().push(Notice {
            message,
            expires_at: Instant::now() + NOTICE_TTL,
        });
    }

    /// Notices still inside their lifetime; expired ones are dropped.
    pub fn active_notices(&self) -> Vec<Notice> {
        let now = Instant::now();
        let mut notices = self.notices.lock().unwrap();
        notices.retain(|n| n.expires_at > now);
        notices.clone()
    }

    /// Schedule a debounced criteria-query update. Each call re-arms the
    /// timer; only the last query within the window is applied.
    pub fn set_query_debounced(self: &Arc<Self>, query: String) {
        let session = self.clone();
        self.search_debounce.schedule(move || {
            session.criteria.lock().unwrap().query = query;
        });
    }

    pub fn clear_selection(&self) {
        self.selection.lock().unwrap().clear();
    }
}

/// Timer-reset primitive: each `schedule` cancels the previously scheduled
/// call and arms a fresh one at the configured delay.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn schedule<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        });
        if let Some(previous) = self.pending.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }
}
