//! The cache store: a locally persisted, read-mostly replica of the three
//! server-owned collections.
//!
//! UI code reads synchronously from [`CacheService`] (always available,
//! possibly stale), applies optimistic mutations after server-confirmed
//! writes, and triggers refreshes that wholesale-replace a collection with
//! the authoritative server list. Every mutation writes through to the
//! configured [`crate::store::Storage`].

pub mod collection;
pub mod service;
pub mod staleness;

pub use collection::CachedCollection;
pub use service::{CacheService, RemoteSource};
pub use staleness::{default_stale_after, is_stale};
