//! Persistence and time abstractions for the cache layer.
//!
//! `Storage` is a plain key-value seam over whatever the host provides
//! (a directory of files in production, a map in tests). `Clock` abstracts
//! "now" so staleness and connectivity rules are deterministic under test.

pub mod adapter;
pub mod clock;

pub use adapter::{FileStorage, MemoryStorage, Storage};
pub use clock::{Clock, SystemClock};
