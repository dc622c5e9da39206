//! Progress persistence
//!
//! The progression engine loads saved state once at session start and writes
//! it back after every transition through this seam.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

use crate::error::{Error, Result};

use super::LevelProgress;

/// Persistence collaborator for progression state
pub trait ProgressStore: Send + Sync {
    /// Load previously saved progress; `None` when nothing usable is stored
    fn load(&self) -> Result<Option<LevelProgress>>;

    /// Persist the given progress
    fn save(&self, progress: &LevelProgress) -> Result<()>;
}

/// Default location of the progress file
pub fn progress_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".promptforge")
        .join("progress.json")
}

/// JSON-file-backed progress store
pub struct JsonFileProgressStore {
    path: PathBuf,
}

impl JsonFileProgressStore {
    /// Create a store at the default path
    pub fn new() -> Self {
        Self {
            path: progress_file_path(),
        }
    }

    /// Create a store at a custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for JsonFileProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore for JsonFileProgressStore {
    fn load(&self) -> Result<Option<LevelProgress>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))?;

        // A corrupt file starts the player over rather than wedging the game
        match serde_json::from_str(&contents) {
            Ok(progress) => Ok(Some(progress)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt progress file");
                Ok(None)
            }
        }
    }

    fn save(&self, progress: &LevelProgress) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("{}: {}", parent.display(), e)))?;
        }

        let contents = serde_json::to_string_pretty(progress)
            .map_err(|e| Error::Storage(format!("failed to serialize progress: {}", e)))?;

        fs::write(&self.path, contents)
            .map_err(|e| Error::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

/// In-memory progress store, used in tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryProgressStore {
    inner: Mutex<Option<LevelProgress>>,
    saves: AtomicUsize,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with pre-seeded progress
    pub fn with_progress(progress: LevelProgress) -> Self {
        Self {
            inner: Mutex::new(Some(progress)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of times `save` has been called
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Acquire)
    }
}

impl ProgressStore for MemoryProgressStore {
    fn load(&self) -> Result<Option<LevelProgress>> {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| Error::Storage("progress store poisoned".to_string()))
    }

    fn save(&self, progress: &LevelProgress) -> Result<()> {
        self.saves.fetch_add(1, Ordering::AcqRel);
        self.inner
            .lock()
            .map(|mut guard| *guard = Some(progress.clone()))
            .map_err(|_| Error::Storage("progress store poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileProgressStore::with_path(temp_dir.path().join("progress.json"));

        assert!(store.load().unwrap().is_none());

        let progress = LevelProgress {
            current_level: 3,
            unlocked_levels: BTreeSet::from([1, 2, 3]),
            completed_levels: BTreeSet::from([1, 2]),
        };
        store.save(&progress).unwrap();

        assert_eq!(store.load().unwrap(), Some(progress));
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let store =
            JsonFileProgressStore::with_path(temp_dir.path().join("nested/dir/progress.json"));
        store.save(&LevelProgress::default()).unwrap();
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn test_corrupt_file_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("progress.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let store = JsonFileProgressStore::with_path(&path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryProgressStore::new();
        assert_eq!(store.save_count(), 0);
        store.save(&LevelProgress::default()).unwrap();
        store.save(&LevelProgress::default()).unwrap();
        assert_eq!(store.save_count(), 2);
        assert!(store.load().unwrap().is_some());
    }
}
