use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::collection::CachedCollection;
use crate::cache::staleness::{default_stale_after, is_stale};
use crate::models::{Entity, Playlist, Schedule, Screen};
use crate::store::{Clock, Storage};

// ============================================================================
// Constants
// ============================================================================

/// Persistence keys: one JSON array per collection plus the last-sync
/// timestamp (epoch milliseconds, stored as a string).
const SCREENS_KEY: &str = "screens";
const PLAYLISTS_KEY: &str = "playlists";
const SCHEDULES_KEY: &str = "schedules";
const LAST_SYNC_KEY: &str = "last_sync";

/// The remote side of the cache: authoritative collection fetchers.
///
/// Implemented by the REST client in production and by fakes in tests. Each
/// fetch is expected to carry its own timeout; the cache treats any error
/// uniformly (keep the snapshot, record the error, retry on the next
/// staleness check).
#[async_trait]
pub trait RemoteSource: Send + Sync {
    async fn fetch_screens(&self) -> Result<Vec<Screen>>;
    async fn fetch_playlists(&self) -> Result<Vec<Playlist>>;
    async fn fetch_schedules(&self) -> Result<Vec<Schedule>>;
}

/// The single source of truth for UI reads.
///
/// Holds the three collection replicas, mediates between optimistic local
/// mutations and authoritative refreshes, and writes every change through to
/// storage. Constructed once at startup and shared by `Arc`; there is no
/// ambient global.
///
/// A refresh landing while a local mutation is in flight overwrites that
/// mutation unless the server already reflects it. That short window where a
/// just-created entity can disappear until the next refresh is the accepted
/// consistency model (server confirms truth), not a bug this layer masks.
pub struct CacheService {
    source: Arc<dyn RemoteSource>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    stale_after: Duration,

    screens: CachedCollection<Screen>,
    playlists: CachedCollection<Playlist>,
    schedules: CachedCollection<Schedule>,

    /// Advanced when a single-collection refresh succeeds, or when all three
    /// legs of an aggregate refresh succeed. The staleness policy reads this.
    last_sync: RwLock<Option<DateTime<Utc>>>,
}

impl CacheService {
    /// Build the service and seed it synchronously from storage. An empty or
    /// corrupt store yields empty collections and an absent sync time, which
    /// the staleness policy reports as stale.
    pub fn new(
        source: Arc<dyn RemoteSource>,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let screens = CachedCollection::new(SCREENS_KEY);
        let playlists = CachedCollection::new(PLAYLISTS_KEY);
        let schedules = CachedCollection::new(SCHEDULES_KEY);

        screens.seed(load_snapshot(storage.as_ref(), SCREENS_KEY));
        playlists.seed(load_snapshot(storage.as_ref(), PLAYLISTS_KEY));
        schedules.seed(load_snapshot(storage.as_ref(), SCHEDULES_KEY));
        let last_sync = load_last_sync(storage.as_ref());

        info!(
            screens = screens.len(),
            playlists = playlists.len(),
            schedules = schedules.len(),
            last_sync = ?last_sync,
            "Cache seeded from storage"
        );

        Self {
            source,
            storage,
            clock,
            stale_after: default_stale_after(),
            screens,
            playlists,
            schedules,
            last_sync: RwLock::new(last_sync),
        }
    }

    /// Override the staleness threshold (default 5 minutes).
    pub fn with_stale_after(mut self, threshold: Duration) -> Self {
        self.stale_after = threshold;
        self
    }

    // =========================================================================
    // Staleness
    // =========================================================================

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read()
    }

    /// Whether the cache as a whole needs a refresh.
    pub fn is_stale(&self) -> bool {
        is_stale(self.last_synced_at(), self.clock.now(), self.stale_after)
    }

    // =========================================================================
    // Screens
    // =========================================================================

    pub fn screens(&self) -> Vec<Screen> {
        self.screens.items()
    }

    pub fn get_screen(&self, id: &str) -> Option<Screen> {
        self.screens.get(id)
    }

    /// Reflect a server-confirmed create (or replace) ahead of the next
    /// refresh.
    pub fn add_screen(&self, screen: Screen) {
        self.screens.upsert(screen);
        self.persist(&self.screens);
    }

    pub fn update_screen(&self, id: &str, f: impl FnOnce(&mut Screen)) {
        if self.screens.update(id, f) {
            self.persist(&self.screens);
        }
    }

    pub fn remove_screen(&self, id: &str) {
        if self.screens.remove(id) {
            self.persist(&self.screens);
        }
    }

    pub fn is_loading_screens(&self) -> bool {
        self.screens.is_loading()
    }

    pub fn last_error_screens(&self) -> Option<String> {
        self.screens.last_error()
    }

    pub fn last_synced_screens(&self) -> Option<DateTime<Utc>> {
        self.screens.synced_at()
    }

    /// Pull the authoritative screen list. Resolves normally on failure; see
    /// [`CacheService::last_error_screens`].
    pub async fn refresh_screens(&self) {
        if self.refresh_screens_leg().await {
            self.advance_last_sync();
        }
    }

    async fn refresh_screens_leg(&self) -> bool {
        // Guard held across the await: cancellation mid-fetch still clears
        // the loading flag.
        let _loading = self.screens.begin_loading();
        let result = self.source.fetch_screens().await;
        self.apply_refresh(&self.screens, result)
    }

    // =========================================================================
    // Playlists
    // =========================================================================

    pub fn playlists(&self) -> Vec<Playlist> {
        self.playlists.items()
    }

    pub fn get_playlist(&self, id: &str) -> Option<Playlist> {
        self.playlists.get(id)
    }

    pub fn add_playlist(&self, playlist: Playlist) {
        self.playlists.upsert(playlist);
        self.persist(&self.playlists);
    }

    pub fn update_playlist(&self, id: &str, f: impl FnOnce(&mut Playlist)) {
        if self.playlists.update(id, f) {
            self.persist(&self.playlists);
        }
    }

    pub fn remove_playlist(&self, id: &str) {
        if self.playlists.remove(id) {
            self.persist(&self.playlists);
        }
    }

    pub fn is_loading_playlists(&self) -> bool {
        self.playlists.is_loading()
    }

    pub fn last_error_playlists(&self) -> Option<String> {
        self.playlists.last_error()
    }

    pub fn last_synced_playlists(&self) -> Option<DateTime<Utc>> {
        self.playlists.synced_at()
    }

    pub async fn refresh_playlists(&self) {
        if self.refresh_playlists_leg().await {
            self.advance_last_sync();
        }
    }

    async fn refresh_playlists_leg(&self) -> bool {
        let _loading = self.playlists.begin_loading();
        let result = self.source.fetch_playlists().await;
        self.apply_refresh(&self.playlists, result)
    }

    // =========================================================================
    // Schedules
    // =========================================================================

    pub fn schedules(&self) -> Vec<Schedule> {
        self.schedules.items()
    }

    pub fn get_schedule(&self, id: &str) -> Option<Schedule> {
        self.schedules.get(id)
    }

    pub fn add_schedule(&self, schedule: Schedule) {
        self.schedules.upsert(schedule);
        self.persist(&self.schedules);
    }

    pub fn update_schedule(&self, id: &str, f: impl FnOnce(&mut Schedule)) {
        if self.schedules.update(id, f) {
            self.persist(&self.schedules);
        }
    }

    pub fn remove_schedule(&self, id: &str) {
        if self.schedules.remove(id) {
            self.persist(&self.schedules);
        }
    }

    pub fn is_loading_schedules(&self) -> bool {
        self.schedules.is_loading()
    }

    pub fn last_error_schedules(&self) -> Option<String> {
        self.schedules.last_error()
    }

    pub fn last_synced_schedules(&self) -> Option<DateTime<Utc>> {
        self.schedules.synced_at()
    }

    pub async fn refresh_schedules(&self) {
        if self.refresh_schedules_leg().await {
            self.advance_last_sync();
        }
    }

    async fn refresh_schedules_leg(&self) -> bool {
        let _loading = self.schedules.begin_loading();
        let result = self.source.fetch_schedules().await;
        self.apply_refresh(&self.schedules, result)
    }

    // =========================================================================
    // Aggregate refresh
    // =========================================================================

    /// Refresh all three collections concurrently. Each leg fails
    /// independently; the shared sync time advances only when every leg
    /// succeeded, so a partial failure leaves the cache stale and retried.
    /// Never returns an error.
    pub async fn refresh_all(&self) {
        info!("Starting aggregate refresh");

        let (screens_ok, playlists_ok, schedules_ok) = tokio::join!(
            self.refresh_screens_leg(),
            self.refresh_playlists_leg(),
            self.refresh_schedules_leg(),
        );

        if screens_ok && playlists_ok && schedules_ok {
            self.advance_last_sync();
            info!("Aggregate refresh complete");
        } else {
            warn!(
                screens = screens_ok,
                playlists = playlists_ok,
                schedules = schedules_ok,
                "Aggregate refresh completed with failures"
            );
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Fold a fetch result into a collection: replace-and-persist on
    /// success, record-and-keep on failure. Returns whether the leg
    /// succeeded.
    fn apply_refresh<T>(&self, coll: &CachedCollection<T>, result: Result<Vec<T>>) -> bool
    where
        T: Entity + Clone + Serialize,
    {
        match result {
            Ok(items) => {
                info!(collection = coll.name(), count = items.len(), "Refreshed");
                coll.replace_all(items, self.clock.now());
                self.persist(coll);
                true
            }
            Err(e) => {
                warn!(
                    collection = coll.name(),
                    error = %e,
                    "Fetch failed, keeping cached snapshot"
                );
                coll.record_error(e.to_string());
                false
            }
        }
    }

    fn advance_last_sync(&self) {
        let now = self.clock.now();
        *self.last_sync.write() = Some(now);
        if let Err(e) = self
            .storage
            .set(LAST_SYNC_KEY, &now.timestamp_millis().to_string())
        {
            warn!(error = %e, "Failed to persist last-sync timestamp");
        }
    }

    /// Write-through persistence. Best effort: failures are logged and the
    /// in-memory snapshot stays authoritative for the session.
    fn persist<T>(&self, coll: &CachedCollection<T>)
    where
        T: Entity + Clone + Serialize,
    {
        match serde_json::to_string(&coll.items()) {
            Ok(json) => {
                if let Err(e) = self.storage.set(coll.name(), &json) {
                    warn!(collection = coll.name(), error = %e, "Failed to persist snapshot");
                }
            }
            Err(e) => {
                warn!(collection = coll.name(), error = %e, "Failed to serialize snapshot");
            }
        }
    }
}

/// Load one collection snapshot from storage. Missing or malformed data is
/// absent, never an error; a corrupt blob just means an empty start and a
/// network refresh.
fn load_snapshot<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Vec<T> {
    let Some(raw) = storage.get(key) else {
        return Vec::new();
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            debug!(key, error = %e, "Malformed cached snapshot, starting empty");
            Vec::new()
        }
    }
}

fn load_last_sync(storage: &dyn Storage) -> Option<DateTime<Utc>> {
    let raw = storage.get(LAST_SYNC_KEY)?;
    match raw.trim().parse::<i64>() {
        Ok(ms) => DateTime::from_timestamp_millis(ms),
        Err(e) => {
            debug!(error = %e, "Malformed last-sync timestamp, treating as never synced");
            None
        }
    }
}
