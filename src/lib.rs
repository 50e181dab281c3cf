//! kioskcache - local cache and sync layer for signage kiosk fleet data.
//!
//! The admin frontend reads screens, playlists, and schedules from a
//! [`cache::CacheService`]: a locally persisted, read-mostly replica of the
//! server-owned collections. Reads are synchronous and always available
//! (possibly stale); refreshes pull the authoritative lists and replace the
//! local snapshot wholesale; optimistic mutators reflect server-confirmed
//! writes ahead of the next refresh. A [`scheduler::RefreshScheduler`]
//! drives refreshes on startup, focus regain, and a fixed interval.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod scheduler;
pub mod store;

pub use api::ApiClient;
pub use cache::{CacheService, RemoteSource};
pub use config::Config;
pub use scheduler::RefreshScheduler;
