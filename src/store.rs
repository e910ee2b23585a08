//! Persistent key-value store collaborator.
//!
//! The core caches three logical values across sessions: the duration map,
//! the rating map, and the move-target shortcut list. Store failures are
//! never fatal; a failed `get` is a cache miss and a failed `put` is logged
//! and forgotten.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const KEY_DURATIONS: &str = "durations";
pub const KEY_RATINGS: &str = "ratings";
pub const KEY_MOVE_TARGETS: &str = "move_targets";

/// Minimal get/put interface over string values.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn put(&self, key: &str, value: &str) -> Result<(), String>;
}

/// On-disk envelope for the JSON file store.
#[derive(Serialize, Deserialize)]
struct Envelope {
    saved_at: DateTime<Utc>,
    entries: HashMap<String, String>,
}

/// Store backed by a single pretty-printed JSON file in the app data dir.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open (or start) the store at `path`. A missing or unparsable file is
    /// treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str::<Envelope>(&contents).ok())
            .map(|env| env.entries)
            .unwrap_or_default();

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Default store location: `~/.sampledeck/cache.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".sampledeck").join("cache.json"))
    }

    fn write_out(&self, entries: &HashMap<String, String>) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create store directory: {}", e))?;
        }
        let envelope = Envelope {
            saved_at: Utc::now(),
            entries: entries.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)
            .map_err(|e| format!("Failed to serialize store: {}", e))?;
        fs::write(&self.path, json).map_err(|e| format!("Failed to write store: {}", e))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<(), String> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.write_out(&entries)
    }
}

/// In-memory store: test double and fallback when no home dir exists.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn put(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Memory store that counts `put` calls per key, for asserting flush
/// behavior in tests.
#[cfg(test)]
pub struct CountingStore {
    inner: MemoryStore,
    put_counts: Mutex<HashMap<String, usize>>,
}

#[cfg(test)]
impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            put_counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn puts(&self, key: &str) -> usize {
        self.put_counts.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
impl KvStore for CountingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), String> {
        *self
            .put_counts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(0) += 1;
        self.inner.put(key, value)
    }
}
