//! Data models for signage fleet entities.
//!
//! This module contains the three server-owned collections the cache layer
//! replicates locally:
//!
//! - `Screen`: a kiosk display with connectivity and usage data
//! - `Playlist`: an ordered set of content slots
//! - `Schedule`: calendar events controlling what plays when
//!
//! All three are keyed by stable server-issued string ids, exposed through
//! the `Entity` trait so a single generic cache collection can serve them.

pub mod playlist;
pub mod schedule;
pub mod screen;

pub use playlist::{Playlist, PlaylistSlot, MAX_PLAYLIST_SLOTS};
pub use schedule::{Schedule, ScheduleAction, ScheduleEvent};
pub use screen::{connectivity, ConnectivityStatus, Screen, DEFAULT_OFFLINE_AFTER_HOURS};

/// A server-owned entity with a stable unique identifier.
///
/// The id is issued by the server and never changes; the cache uses it for
/// lookups, upserts, and deduplication.
pub trait Entity {
    fn id(&self) -> &str;
}
