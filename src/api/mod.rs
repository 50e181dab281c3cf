//! REST client for the signage fleet backend.
//!
//! The production implementation of [`crate::cache::RemoteSource`]: fetches
//! the authoritative screen, playlist, and schedule lists, and carries the
//! server-write calls (create/update/delete) whose confirmations feed the
//! cache's optimistic mutators.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
