//! Key-value persistence
//!
//! Everything Tomate persists goes through a [`StatsStore`]: a flat,
//! string-keyed map of string values (JSON or plain primitives).
//! - [`MemoryStore`]: in-process map, used by tests
//! - [`FileStore`]: one `<key>.json` file per key under a data directory

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persisted key names
pub mod keys {
    pub const DAILY_STATS: &str = "dailyStats";
    pub const WEEKLY_STATS: &str = "weeklyStats";
    pub const TASKS: &str = "tasks";
    pub const COMPLETED_POMODOROS: &str = "completedPomodoros";
    pub const TIMER_SETTINGS: &str = "timerSettings";
    pub const SECONDS_LEFT: &str = "secondsLeft";
    pub const TIMER_IS_ACTIVE: &str = "timerIsActive";
    pub const TIMER_MODE: &str = "timerMode";
    pub const SOUND_ENABLED: &str = "soundEnabled";
}

/// Store-specific errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid key name: {0}")]
    InvalidKey(String),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt value for '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed store of string values
pub trait StatsStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Write several keys as one unit. Stores that can stage writes should
    /// override this so a failure leaves every key at its old value.
    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Read and decode a JSON value
pub fn get_json<T, S>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    S: StatsStore + ?Sized,
{
    match store.get(key)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            }),
    }
}

/// Encode a value for storage under `key`
pub fn to_json<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every read and write fails
    pub fn unavailable() -> Self {
        Self {
            values: HashMap::new(),
            unavailable: true,
        }
    }

    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

impl StatsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check()?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        self.check()?;
        for (key, value) in entries {
            self.values.insert(key.to_string(), value.clone());
        }
        Ok(())
    }
}

/// Directory-backed store
pub struct FileStore {
    /// Base directory for stored keys
    dir: PathBuf,
}

impl FileStore {
    /// Create a file store rooted at the given directory
    pub fn new(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a key; keys are restricted so they cannot escape the directory
    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    fn staging_path(path: &Path) -> PathBuf {
        path.with_extension("json.tmp")
    }

    fn write_file(path: &Path, value: &str) -> Result<(), StoreError> {
        fs::write(path, value).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn rename(from: &Path, to: &Path) -> Result<(), StoreError> {
        fs::rename(from, to).map_err(|source| StoreError::Io {
            path: to.to_path_buf(),
            source,
        })
    }
}

/// `set_many` stages every value before touching any key, so a failed
/// serialization or write changes nothing. The renames that follow are
/// atomic per file only: if one fails, earlier keys keep their new values
/// and the remaining staged files are removed.
impl StatsStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| StoreError::Io { path, source })
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        let staged = Self::staging_path(&path);
        Self::write_file(&staged, value)?;
        Self::rename(&staged, &path)
    }

    fn set_many(&mut self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let mut staged = Vec::with_capacity(entries.len());

        for (key, value) in entries {
            let result = self
                .key_path(key)
                .and_then(|path| {
                    let tmp = Self::staging_path(&path);
                    Self::write_file(&tmp, value).map(|_| (tmp, path))
                });

            match result {
                Ok(pair) => staged.push(pair),
                Err(e) => {
                    for (tmp, _) in &staged {
                        let _ = fs::remove_file(tmp);
                    }
                    return Err(e);
                }
            }
        }

        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = Self::rename(tmp, path) {
                for (leftover, _) in &staged[i..] {
                    let _ = fs::remove_file(leftover);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("tasks").unwrap(), None);
        store.set("tasks", "[]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_unavailable_memory_store() {
        let mut store = MemoryStore::unavailable();
        assert!(matches!(store.get("x"), Err(StoreError::Unavailable(_))));
        assert!(store.set("x", "1").is_err());
        assert!(store.set_many(&[("x", "1".to_string())]).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_json_reports_corruption() {
        let mut store = MemoryStore::new();
        store.set("dailyStats", "{not json").unwrap();
        let result: Result<Option<Vec<u32>>, _> = get_json(&store, "dailyStats");
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn test_get_json_treats_blank_as_missing() {
        let mut store = MemoryStore::new();
        store.set("tasks", "  ").unwrap();
        let result: Option<Vec<u32>> = get_json(&store, "tasks").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_file_store_set_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(&dir.path().join("store")).unwrap();

        store.set("secondsLeft", "1500").unwrap();
        assert_eq!(store.get("secondsLeft").unwrap().as_deref(), Some("1500"));
        assert!(dir.path().join("store").join("secondsLeft.json").exists());
        assert_eq!(store.get("timerMode").unwrap(), None);
    }

    #[test]
    fn test_file_store_set_many_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();

        store
            .set_many(&[("dailyStats", "[]".to_string()), ("weeklyStats", "[]".to_string())])
            .unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with(".json")));
    }

    #[test]
    fn test_file_store_set_many_rejects_bad_key_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();
        store.set("dailyStats", "[1]").unwrap();

        let result = store.set_many(&[
            ("dailyStats", "[2]".to_string()),
            ("../escape", "[]".to_string()),
        ]);
        assert!(matches!(result, Err(StoreError::InvalidKey(_))));
        assert_eq!(store.get("dailyStats").unwrap().as_deref(), Some("[1]"));
        assert!(!dir.path().join("dailyStats.json.tmp").exists());
    }

    #[test]
    fn test_file_store_failed_rename_cleans_up_staging() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path()).unwrap();

        // A non-empty directory where the weekly file should go makes its rename fail
        let blocker = dir.path().join("weeklyStats.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let result = store.set_many(&[
            ("dailyStats", "[1]".to_string()),
            ("weeklyStats", "[2]".to_string()),
        ]);
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(store.get("dailyStats").unwrap().as_deref(), Some("[1]"));
        assert!(!dir.path().join("dailyStats.json.tmp").exists());
        assert!(!dir.path().join("weeklyStats.json.tmp").exists());
    }
}
