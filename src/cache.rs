//! Client-side response cache.
//!
//! Entries are keyed by the full request URL and never expire. The raw [`Storage`] trait mirrors
//! browser local storage (string keys, string values) so it can be swapped for an in-memory map
//! in tests or a JSON file on disk for the server.

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error, warn};

pub trait Storage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String);
}

#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }
}

/// Whole-map JSON file, loaded once and rewritten on every write.
///
/// Reads only take the `items` lock. Writes are serialized by `write_lock` and replace the file
/// through a sibling `.tmp` file, outside the `items` lock.
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = load_items(&path);
        debug!("Opened cache file {} with {} entries", path.display(), items.len());
        Self {
            path,
            items: Mutex::new(items),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, items: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create cache directory {}: {}", parent.display(), e);
                return;
            }
        }
        let body = match serde_json::to_string(items) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize cache: {}", e);
                return;
            }
        };
        let tmp = self.temp_path();
        if let Err(e) = fs::write(&tmp, body) {
            error!("Failed to write cache file {}: {}", tmp.display(), e);
            return;
        }
        if let Err(e) = fs::rename(&tmp, &self.path) {
            error!("Failed to replace cache file {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp);
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn load_items(path: &Path) -> HashMap<String, String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return HashMap::new(),
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
        HashMap::new()
    })
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: String) {
        // Held across snapshot and flush so an older snapshot never lands after a newer one.
        let _writer = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
            items.insert(key.to_string(), value);
            items.clone()
        };
        self.flush(&snapshot);
    }
}

/// JSON view over a [`Storage`]. A stored value that no longer parses is a miss.
#[derive(Clone)]
pub struct ResponseCache {
    storage: Arc<dyn Storage>,
}

impl ResponseCache {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let raw = self.storage.get_item(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("Discarding corrupt cache entry for {}: {}", key, e);
                None
            }
        }
    }

    pub fn put(&self, key: &str, value: &Value) {
        self.storage.set_item(key, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip() {
        let cache = ResponseCache::in_memory();
        let value = json!({"name": "Jita", "security_status": 0.9459});
        cache.put("https://esi/systems/30000142/", &value);
        assert_eq!(cache.get("https://esi/systems/30000142/"), Some(value));
        assert_eq!(cache.get("https://esi/systems/30000144/"), None);
    }

    #[test]
    fn put_overwrites() {
        let cache = ResponseCache::in_memory();
        cache.put("k", &json!(1));
        cache.put("k", &json!(2));
        assert_eq!(cache.get("k"), Some(json!(2)));
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("k", "{not json".to_string());
        let cache = ResponseCache::new(storage.clone());
        assert_eq!(cache.get("k"), None);
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn query_parameters_keep_keys_apart() {
        let cache = ResponseCache::in_memory();
        cache.put("https://esi/a/?datasource=tranquility", &json!("tq"));
        cache.put("https://esi/a/?datasource=singularity", &json!("sisi"));
        assert_eq!(
            cache.get("https://esi/a/?datasource=tranquility"),
            Some(json!("tq"))
        );
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        let cache = ResponseCache::new(Arc::new(FileStorage::open(&path)));
        cache.put("url", &json!([1, 2, 3]));

        let reopened = ResponseCache::new(Arc::new(FileStorage::open(&path)));
        assert_eq!(reopened.get("url"), Some(json!([1, 2, 3])));
    }

    #[test]
    fn concurrent_writes_all_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let storage = Arc::new(FileStorage::open(&path));

        let writers: Vec<_> = (0..8)
            .map(|n| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        storage.set_item(&format!("url/{}/{}", n, i), format!("[{}]", i));
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let reopened = FileStorage::open(&path);
        for n in 0..8 {
            for i in 0..10 {
                assert_eq!(
                    reopened.get_item(&format!("url/{}/{}", n, i)),
                    Some(format!("[{}]", i))
                );
            }
        }
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[test]
    fn unreadable_cache_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "garbage").unwrap();

        let storage = FileStorage::open(&path);
        assert_eq!(storage.get_item("url"), None);
        assert_eq!(storage.path(), path.as_path());
    }
}
