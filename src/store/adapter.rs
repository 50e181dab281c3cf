use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::debug;

/// Key-value persistence for serialized cache snapshots.
///
/// Reads never fail to the caller: missing or unreadable data is simply
/// absent. Writes return an error so callers can log it, but persistence is
/// best-effort throughout the crate - the in-memory cache stays
/// authoritative for the running session.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed storage: one file per key under a cache directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!(key, error = %e, "Failed to read cache file, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .with_context(|| format!("Failed to write cache file {}", path.display()))
    }
}

/// In-memory storage for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        assert_eq!(storage.get("screens"), None);
        storage.set("screens", r#"[{"id":"S1"}]"#).unwrap();
        assert_eq!(storage.get("screens").as_deref(), Some(r#"[{"id":"S1"}]"#));
    }

    #[test]
    fn file_storage_overwrites_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        storage.set("last_sync", "100").unwrap();
        storage.set("last_sync", "200").unwrap();
        assert_eq!(storage.get("last_sync").as_deref(), Some("200"));
    }

    #[test]
    fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get("playlists"), None);
        storage.set("playlists", "[]").unwrap();
        assert_eq!(storage.get("playlists").as_deref(), Some("[]"));
    }
}
