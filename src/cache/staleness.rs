use chrono::{DateTime, Duration, Utc};

/// Consider the cache stale 5 minutes after the last successful sync.
/// Fleet data changes slowly, but operators expect connectivity status to
/// track reality within a few minutes.
const STALE_AFTER_MS: i64 = 300_000;

/// The default staleness threshold (5 minutes).
pub fn default_stale_after() -> Duration {
    Duration::milliseconds(STALE_AFTER_MS)
}

/// Whether a snapshot last synced at `last_sync` is stale at `now`.
///
/// A never-synced cache (`None`) is always stale. Otherwise the snapshot is
/// stale strictly after `threshold` has elapsed; exactly at the threshold it
/// is still fresh.
pub fn is_stale(last_sync: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match last_sync {
        None => true,
        Some(at) => now - at > threshold,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_timestamp_is_always_stale() {
        let now = Utc::now();
        assert!(is_stale(None, now, Duration::milliseconds(0)));
        assert!(is_stale(None, now, Duration::days(365)));
    }

    #[test]
    fn fresh_just_inside_threshold() {
        let now = Utc::now();
        let last = now - Duration::milliseconds(299_999);
        assert!(!is_stale(Some(last), now, default_stale_after()));
    }

    #[test]
    fn stale_just_past_threshold() {
        let now = Utc::now();
        let last = now - Duration::milliseconds(300_001);
        assert!(is_stale(Some(last), now, default_stale_after()));
    }

    #[test]
    fn exactly_at_threshold_is_fresh() {
        let now = Utc::now();
        let last = now - Duration::milliseconds(300_000);
        assert!(!is_stale(Some(last), now, default_stale_after()));
    }
}
