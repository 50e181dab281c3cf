//! Refresh scheduling: decides *when* the cache refreshes, so neither the
//! UI nor the cache store manages timers.
//!
//! Three triggers feed [`crate::cache::CacheService::refresh_all`]:
//! startup (if stale), focus regain (if stale), and a fixed interval
//! (unconditional). Pages trigger their own per-collection refreshes
//! directly on the service; those may overlap with the aggregate schedule,
//! and overlapping refreshes of the same collection are deliberately not
//! coalesced - replacement is idempotent and the last completion wins.
//!
//! Every background task is registered under a name and can be cancelled
//! individually or all at once on shutdown.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheService;

// ============================================================================
// Constants
// ============================================================================

/// Periodic background refresh interval. Matches the staleness threshold so
/// a foregrounded app never reports stale data between ticks.
const REFRESH_INTERVAL_SECS: u64 = 300;

/// Task names used in the registry and in logs.
pub const TASK_STARTUP: &str = "startup";
pub const TASK_INTERVAL: &str = "interval";
pub const TASK_FOCUS: &str = "focus";

/// Owns the background refresh tasks for one [`CacheService`].
///
/// Dropping the scheduler aborts anything still running.
pub struct RefreshScheduler {
    service: Arc<CacheService>,
    interval: Duration,
    tasks: Mutex<HashMap<&'static str, JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(service: Arc<CacheService>) -> Self {
        Self {
            service,
            interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Override the periodic refresh interval (default 5 minutes).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Wire up the startup and interval triggers. Returns immediately; the
    /// seeded snapshot stays readable while refreshes run in the background.
    pub fn start(&self) {
        self.spawn_startup_refresh();
        self.spawn_interval_refresh();
    }

    /// One-shot: refresh on startup only if the seeded snapshot is stale.
    fn spawn_startup_refresh(&self) {
        let service = Arc::clone(&self.service);
        self.register(
            TASK_STARTUP,
            tokio::spawn(async move {
                if service.is_stale() {
                    info!("Cache stale at startup, refreshing");
                    service.refresh_all().await;
                } else {
                    debug!("Cache fresh at startup, skipping refresh");
                }
            }),
        );
    }

    /// Unconditional periodic refresh. This both refreshes data and resets
    /// the staleness clock.
    fn spawn_interval_refresh(&self) {
        let service = Arc::clone(&self.service);
        let period = self.interval;
        self.register(
            TASK_INTERVAL,
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                // The first tick fires immediately; startup already covers it.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    debug!("Interval refresh tick");
                    service.refresh_all().await;
                }
            }),
        );
    }

    /// Call when the application regains foreground/visibility. Refreshes
    /// only if stale, without blocking the caller.
    pub fn on_focus_regained(&self) {
        if !self.service.is_stale() {
            debug!("Focus regained with fresh cache, skipping refresh");
            return;
        }
        let service = Arc::clone(&self.service);
        self.register(
            TASK_FOCUS,
            tokio::spawn(async move {
                info!("Cache stale on focus regain, refreshing");
                service.refresh_all().await;
            }),
        );
    }

    /// Cancel one named task. Returns whether a task was registered under
    /// that name.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks.lock().remove(name) {
            Some(handle) => {
                handle.abort();
                debug!(task = name, "Cancelled scheduled task");
                true
            }
            None => false,
        }
    }

    /// Abort every registered task. Called on application shutdown.
    pub fn shutdown(&self) {
        let mut tasks = self.tasks.lock();
        for (name, handle) in tasks.drain() {
            handle.abort();
            debug!(task = name, "Aborted scheduled task");
        }
    }

    /// Register a task under a name, replacing (and aborting) any previous
    /// task with the same name.
    fn register(&self, name: &'static str, handle: JoinHandle<()>) {
        if let Some(previous) = self.tasks.lock().insert(name, handle) {
            previous.abort();
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;

    use super::*;
    use crate::cache::RemoteSource;
    use crate::models::{Playlist, Schedule, Screen};
    use crate::store::{MemoryStorage, SystemClock};

    /// Counts aggregate fetches; always returns empty lists.
    #[derive(Default)]
    struct CountingSource {
        screen_fetches: AtomicUsize,
    }

    #[async_trait]
    impl RemoteSource for CountingSource {
        async fn fetch_screens(&self) -> Result<Vec<Screen>> {
            self.screen_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn fetch_playlists(&self) -> Result<Vec<Playlist>> {
            Ok(vec![])
        }

        async fn fetch_schedules(&self) -> Result<Vec<Schedule>> {
            Ok(vec![])
        }
    }

    fn service_with(source: Arc<CountingSource>) -> Arc<CacheService> {
        Arc::new(CacheService::new(
            source,
            Arc::new(MemoryStorage::new()),
            Arc::new(SystemClock),
        ))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn startup_refreshes_when_never_synced() {
        let source = Arc::new(CountingSource::default());
        let service = service_with(Arc::clone(&source));

        let scheduler = RefreshScheduler::new(Arc::clone(&service));
        scheduler.start();

        // Give the startup task time to run
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(source.screen_fetches.load(Ordering::SeqCst), 1);
        assert!(!service.is_stale());
        scheduler.shutdown();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn focus_regain_skips_refresh_when_fresh() {
        let source = Arc::new(CountingSource::default());
        let service = service_with(Arc::clone(&source));

        // Make the cache fresh first
        service.refresh_all().await;
        assert_eq!(source.screen_fetches.load(Ordering::SeqCst), 1);

        let scheduler = RefreshScheduler::new(Arc::clone(&service));
        scheduler.on_focus_regained();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Fresh cache: no additional fetch
        assert_eq!(source.screen_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn interval_task_keeps_refreshing() {
        let source = Arc::new(CountingSource::default());
        let service = service_with(Arc::clone(&source));

        let scheduler = RefreshScheduler::new(Arc::clone(&service))
            .with_interval(Duration::from_millis(30));
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(120)).await;
        scheduler.shutdown();

        // Startup fires once, then the interval task at least twice more
        assert!(source.screen_fetches.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_stops_a_named_task() {
        let source = Arc::new(CountingSource::default());
        let service = service_with(Arc::clone(&source));

        let scheduler = RefreshScheduler::new(Arc::clone(&service))
            .with_interval(Duration::from_millis(20));
        scheduler.start();
        // Let the startup task finish before cancelling the interval task
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(scheduler.cancel(TASK_INTERVAL));
        assert!(!scheduler.cancel(TASK_INTERVAL));

        let after_cancel = source.screen_fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(source.screen_fetches.load(Ordering::SeqCst), after_cancel);
    }
}
