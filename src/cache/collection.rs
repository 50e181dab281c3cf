use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::models::Entity;

/// Per-collection state guarded by one lock: the snapshot itself plus the
/// bookkeeping the UI observes (sync time, last error, loading flag).
struct CollectionState<T> {
    items: Vec<T>,
    synced_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    loading: bool,
}

/// An in-memory replica of one server-owned collection.
///
/// Reads and local mutations are synchronous and never fail. A successful
/// refresh calls [`CachedCollection::replace_all`], which discards the prior
/// snapshot entirely - server state always wins over optimistic mutations.
///
/// One generic type serves screens, playlists, and schedules; the only
/// requirement is a stable id via [`Entity`].
pub struct CachedCollection<T> {
    name: &'static str,
    state: RwLock<CollectionState<T>>,
}

impl<T: Entity + Clone> CachedCollection<T> {
    /// `name` doubles as the persistence key and the log field.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(CollectionState {
                items: Vec::new(),
                synced_at: None,
                last_error: None,
                loading: false,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Install a snapshot loaded from persistence. Does not count as a sync.
    pub fn seed(&self, items: Vec<T>) {
        let mut state = self.state.write();
        state.items = dedupe_by_id(self.name, items);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current snapshot, in server (or locally mutated) order.
    pub fn items(&self) -> Vec<T> {
        self.state.read().items.clone()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.state.read().items.iter().find(|e| e.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().items.is_empty()
    }

    pub fn synced_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().synced_at
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.read().last_error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    // =========================================================================
    // Local mutations
    // =========================================================================

    /// Replace the entity with the same id, or append if none exists.
    pub fn upsert(&self, entity: T) {
        let mut state = self.state.write();
        match state.items.iter_mut().find(|e| e.id() == entity.id()) {
            Some(existing) => *existing = entity,
            None => state.items.push(entity),
        }
    }

    /// Apply `f` to the entity with the given id. Returns false (and leaves
    /// the collection untouched) when the id is unknown; never an error.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut T)) -> bool {
        let mut state = self.state.write();
        match state.items.iter_mut().find(|e| e.id() == id) {
            Some(existing) => {
                f(existing);
                true
            }
            None => {
                debug!(collection = self.name, id, "Update on unknown id ignored");
                false
            }
        }
    }

    /// Delete the entity with the given id. Idempotent: returns false when
    /// nothing was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut state = self.state.write();
        let before = state.items.len();
        state.items.retain(|e| e.id() != id);
        state.items.len() != before
    }

    // =========================================================================
    // Refresh bookkeeping
    // =========================================================================

    /// Mark the collection as loading for as long as the returned guard
    /// lives. The guard clears the flag on drop, so a refresh future that
    /// is cancelled mid-fetch cannot strand a UI spinner.
    pub fn begin_loading(&self) -> LoadingGuard<'_, T> {
        self.state.write().loading = true;
        LoadingGuard { coll: self }
    }

    /// Wholesale replacement after a successful fetch: the fetched list
    /// becomes the snapshot, the sync time advances, and any prior error is
    /// cleared.
    pub fn replace_all(&self, items: Vec<T>, at: DateTime<Utc>) {
        let items = dedupe_by_id(self.name, items);
        let mut state = self.state.write();
        state.items = items;
        state.synced_at = Some(at);
        state.last_error = None;
        state.loading = false;
    }

    /// Record a fetch failure. The snapshot and sync time stay untouched so
    /// the next staleness check retries.
    pub fn record_error(&self, message: String) {
        let mut state = self.state.write();
        state.last_error = Some(message);
        state.loading = false;
    }
}

/// Keeps a collection's loading flag raised; see
/// [`CachedCollection::begin_loading`].
pub struct LoadingGuard<'a, T> {
    coll: &'a CachedCollection<T>,
}

impl<T> Drop for LoadingGuard<'_, T> {
    fn drop(&mut self) {
        self.coll.state.write().loading = false;
    }
}

/// The cache never stores two entries with the same id; if the server list
/// contains duplicates, the first occurrence wins.
fn dedupe_by_id<T: Entity>(name: &str, items: Vec<T>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    let before = items.len();
    let deduped: Vec<T> = items
        .into_iter()
        .filter(|e| seen.insert(e.id().to_string()))
        .collect();
    if deduped.len() != before {
        debug!(
            collection = name,
            dropped = before - deduped.len(),
            "Dropped duplicate ids from fetched list"
        );
    }
    deduped
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Screen;

    fn screen(id: &str, name: &str) -> Screen {
        Screen {
            id: id.to_string(),
            name: name.to_string(),
            location: None,
            flow: None,
            active: true,
            last_seen: None,
            session_count: 0,
            measurement_count: 0,
        }
    }

    #[test]
    fn upsert_appends_then_replaces() {
        let coll = CachedCollection::new("screens");
        coll.upsert(screen("S1", "Lobby"));
        coll.upsert(screen("S2", "Gym"));
        assert_eq!(coll.len(), 2);

        coll.upsert(screen("S1", "Lobby East"));
        assert_eq!(coll.len(), 2);
        assert_eq!(coll.get("S1").unwrap().name, "Lobby East");
    }

    #[test]
    fn local_mutation_visible_to_next_read() {
        let coll = CachedCollection::new("screens");
        coll.upsert(screen("S1", "Lobby"));
        assert_eq!(coll.get("S1").unwrap().name, "Lobby");
    }

    #[test]
    fn update_merges_fields_in_place() {
        let coll = CachedCollection::new("screens");
        coll.upsert(screen("S1", "Lobby"));

        let changed = coll.update("S1", |s| {
            s.name = "Lobby North".to_string();
            s.location = Some("Floor 2".to_string());
        });
        assert!(changed);

        let s = coll.get("S1").unwrap();
        assert_eq!(s.name, "Lobby North");
        assert_eq!(s.location.as_deref(), Some("Floor 2"));
    }

    #[test]
    fn update_on_unknown_id_is_a_noop() {
        let coll = CachedCollection::<Screen>::new("screens");
        assert!(!coll.update("missing", |s| s.name.clear()));
        assert!(coll.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let coll = CachedCollection::new("screens");
        coll.upsert(screen("S1", "Lobby"));
        assert!(coll.remove("S1"));
        assert!(!coll.remove("S1"));
        assert!(coll.is_empty());
    }

    #[test]
    fn replace_all_discards_prior_snapshot() {
        let coll = CachedCollection::new("screens");
        coll.upsert(screen("S1", "Lobby"));
        coll.upsert(screen("S2", "Gym"));

        let now = Utc::now();
        coll.replace_all(vec![screen("S3", "Cafe")], now);

        assert_eq!(coll.len(), 1);
        assert!(coll.get("S1").is_none());
        assert!(coll.get("S3").is_some());
        assert_eq!(coll.synced_at(), Some(now));
    }

    #[test]
    fn replace_all_dedupes_first_occurrence_wins() {
        let coll = CachedCollection::new("screens");
        coll.replace_all(
            vec![screen("S1", "First"), screen("S1", "Second")],
            Utc::now(),
        );
        assert_eq!(coll.len(), 1);
        assert_eq!(coll.get("S1").unwrap().name, "First");
    }

    #[test]
    fn record_error_keeps_snapshot_and_sync_time() {
        let coll = CachedCollection::new("screens");
        let now = Utc::now();
        coll.replace_all(vec![screen("S1", "Lobby")], now);

        let _loading = coll.begin_loading();
        coll.record_error("boom".to_string());

        assert_eq!(coll.len(), 1);
        assert_eq!(coll.synced_at(), Some(now));
        assert_eq!(coll.last_error().as_deref(), Some("boom"));
        assert!(!coll.is_loading());
    }

    #[test]
    fn loading_guard_clears_flag_on_drop() {
        let coll = CachedCollection::<Screen>::new("screens");
        let guard = coll.begin_loading();
        assert!(coll.is_loading());
        drop(guard);
        assert!(!coll.is_loading());
    }

    #[test]
    fn successful_replace_clears_previous_error() {
        let coll = CachedCollection::new("screens");
        coll.record_error("boom".to_string());
        coll.replace_all(vec![screen("S1", "Lobby")], Utc::now());
        assert!(coll.last_error().is_none());
    }
}
