//! Partition storage backends.
//!
//! Storage is deliberately synchronous and minimal: a whole-partition
//! `delete`, a single-key `put`, and lookups. Each backend makes a single
//! `put` atomic, which is all the cache manager relies on when concurrent
//! requests write to the same partition.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CacheError, CachedData, RequestKey, Response};

pub type CachedResponse = CachedData<Response>;

pub trait CacheStorage: Send + Sync {
    /// Create the partition if absent. Returns true when it was created.
    fn open(&self, partition: &str) -> Result<bool, CacheError>;

    fn has(&self, partition: &str) -> Result<bool, CacheError>;

    /// Partition names in creation order
    fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Remove a partition and all its entries. Returns false if it did not exist.
    fn delete(&self, partition: &str) -> Result<bool, CacheError>;

    /// Store an entry, creating the partition if needed
    fn put(&self, partition: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), CacheError>;

    fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>, CacheError>;

    fn entries(&self, partition: &str) -> Result<Vec<(RequestKey, CachedResponse)>, CacheError>;

    /// Search every partition, oldest first, for a matching entry.
    /// An unreadable partition is skipped rather than failing the search.
    fn lookup_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>, CacheError> {
        for partition in self.keys()? {
            match self.lookup(&partition, key) {
                Ok(Some(hit)) => return Ok(Some(hit)),
                Ok(None) => {}
                Err(e) => warn!(partition = %partition, error = %e, "Skipping unreadable partition"),
            }
        }
        Ok(None)
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

type Partition = HashMap<RequestKey, CachedResponse>;

/// Partitions held in process memory. Clone shares the same partitions.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    partitions: Arc<RwLock<Vec<(String, Partition)>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<(String, Partition)>> {
        self.partitions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<(String, Partition)>> {
        self.partitions.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl CacheStorage for MemoryStorage {
    fn open(&self, partition: &str) -> Result<bool, CacheError> {
        let mut partitions = self.write();
        if partitions.iter().any(|(name, _)| name == partition) {
            return Ok(false);
        }
        partitions.push((partition.to_string(), Partition::new()));
        Ok(true)
    }

    fn has(&self, partition: &str) -> Result<bool, CacheError> {
        Ok(self.read().iter().any(|(name, _)| name == partition))
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.read().iter().map(|(name, _)| name.clone()).collect())
    }

    fn delete(&self, partition: &str) -> Result<bool, CacheError> {
        let mut partitions = self.write();
        let before = partitions.len();
        partitions.retain(|(name, _)| name != partition);
        Ok(partitions.len() != before)
    }

    fn put(&self, partition: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), CacheError> {
        let mut partitions = self.write();
        match partitions.iter_mut().find(|(name, _)| name == partition) {
            Some((_, entries)) => {
                entries.insert(key.clone(), entry);
            }
            None => {
                let mut entries = Partition::new();
                entries.insert(key.clone(), entry);
                partitions.push((partition.to_string(), entries));
            }
        }
        Ok(())
    }

    fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>, CacheError> {
        Ok(self
            .read()
            .iter()
            .find(|(name, _)| name == partition)
            .and_then(|(_, entries)| entries.get(key).cloned()))
    }

    fn entries(&self, partition: &str) -> Result<Vec<(RequestKey, CachedResponse)>, CacheError> {
        let mut entries: Vec<(RequestKey, CachedResponse)> = self
            .read()
            .iter()
            .find(|(name, _)| name == partition)
            .map(|(_, entries)| entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }
}

// ============================================================================
// On-disk backend
// ============================================================================

/// Index file listing partitions in creation order
const INDEX_FILE: &str = "partitions.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct PartitionFile {
    created_at: Option<DateTime<Utc>>,
    entries: HashMap<RequestKey, CachedResponse>,
}

/// Partitions stored as `<name>.json` files under a cache directory.
pub struct DiskStorage {
    cache_dir: PathBuf,
    // Serializes read-modify-write cycles on the JSON files
    lock: Mutex<()>,
}

impl DiskStorage {
    pub fn new(cache_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cache_path(&self, name: &str) -> Result<PathBuf, CacheError> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.starts_with('.') {
            return Err(CacheError::Storage(format!("Invalid partition name: {}", name)));
        }
        Ok(self.cache_dir.join(format!("{}.json", name)))
    }

    fn load_index(&self) -> Result<Vec<String>, CacheError> {
        let path = self.cache_dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save_index(&self, index: &[String]) -> Result<(), CacheError> {
        let path = self.cache_dir.join(INDEX_FILE);
        std::fs::write(path, serde_json::to_string_pretty(index)?)?;
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Option<PartitionFile>, CacheError> {
        let path = self.cache_path(name)?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, name: &str, partition: &PartitionFile) -> Result<(), CacheError> {
        let path = self.cache_path(name)?;
        std::fs::write(path, serde_json::to_string(partition)?)?;
        Ok(())
    }

    /// Create the partition file and index entry; caller holds the lock.
    fn create(&self, name: &str) -> Result<bool, CacheError> {
        let mut index = self.load_index()?;
        if index.iter().any(|n| n == name) {
            return Ok(false);
        }
        self.save(
            name,
            &PartitionFile {
                created_at: Some(Utc::now()),
                entries: HashMap::new(),
            },
        )?;
        index.push(name.to_string());
        self.save_index(&index)?;
        debug!(partition = name, "Created cache partition");
        Ok(true)
    }
}

impl CacheStorage for DiskStorage {
    fn open(&self, partition: &str) -> Result<bool, CacheError> {
        let _guard = self.guard();
        self.create(partition)
    }

    fn has(&self, partition: &str) -> Result<bool, CacheError> {
        let _guard = self.guard();
        Ok(self.load_index()?.iter().any(|n| n == partition))
    }

    fn keys(&self) -> Result<Vec<String>, CacheError> {
        let _guard = self.guard();
        self.load_index()
    }

    fn delete(&self, partition: &str) -> Result<bool, CacheError> {
        let _guard = self.guard();
        let mut index = self.load_index()?;
        let before = index.len();
        index.retain(|n| n != partition);
        let existed = index.len() != before;

        let path = self.cache_path(partition)?;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        if existed {
            self.save_index(&index)?;
        }
        Ok(existed)
    }

    fn put(&self, partition: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), CacheError> {
        let _guard = self.guard();
        self.create(partition)?;
        let mut file = self.load(partition)?.unwrap_or_default();
        file.entries.insert(key.clone(), entry);
        self.save(partition, &file)
    }

    fn lookup(&self, partition: &str, key: &RequestKey) -> Result<Option<CachedResponse>, CacheError> {
        let _guard = self.guard();
        Ok(self
            .load(partition)?
            .and_then(|mut file| file.entries.remove(key)))
    }

    fn entries(&self, partition: &str) -> Result<Vec<(RequestKey, CachedResponse)>, CacheError> {
        let _guard = self.guard();
        let mut entries: Vec<(RequestKey, CachedResponse)> = self
            .load(partition)?
            .map(|file| file.entries.into_iter().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    fn lookup_any(&self, key: &RequestKey) -> Result<Option<CachedResponse>, CacheError> {
        let _guard = self.guard();
        for partition in self.load_index()? {
            match self.load(&partition) {
                Ok(file) => {
                    if let Some(hit) = file.and_then(|mut f| f.entries.remove(key)) {
                        return Ok(Some(hit));
                    }
                }
                Err(e) => warn!(partition = %partition, error = %e, "Skipping unreadable partition"),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Request;
    use reqwest::Url;

    fn key(path: &str) -> RequestKey {
        Request::get(Url::parse(&format!("https://criyago.app{}", path)).unwrap()).key()
    }

    fn entry(body: &str) -> CachedResponse {
        CachedData::new(Response::new("https://criyago.app/", 200, body))
    }

    fn exercise_backend(storage: &dyn CacheStorage) {
        assert!(storage.open("criyago-static-v2.0").unwrap());
        assert!(!storage.open("criyago-static-v2.0").unwrap());

        storage.put("criyago-static-v2.0", &key("/"), entry("home")).unwrap();
        storage.put("criyago-dynamic-v2.0", &key("/games"), entry("games")).unwrap();
        assert_eq!(
            storage.keys().unwrap(),
            vec!["criyago-static-v2.0".to_string(), "criyago-dynamic-v2.0".to_string()]
        );

        let hit = storage.lookup("criyago-static-v2.0", &key("/")).unwrap().unwrap();
        assert_eq!(hit.data.body_text(), "home");
        assert!(storage.lookup("criyago-static-v2.0", &key("/games")).unwrap().is_none());
        assert_eq!(
            storage.lookup_any(&key("/games")).unwrap().unwrap().data.body_text(),
            "games"
        );

        // Same key overwrites
        storage.put("criyago-static-v2.0", &key("/"), entry("home v2")).unwrap();
        assert_eq!(storage.entries("criyago-static-v2.0").unwrap().len(), 1);

        assert!(storage.delete("criyago-dynamic-v2.0").unwrap());
        assert!(!storage.delete("criyago-dynamic-v2.0").unwrap());
        assert!(!storage.has("criyago-dynamic-v2.0").unwrap());
        assert!(storage.lookup_any(&key("/games")).unwrap().is_none());
    }

    #[test]
    fn test_memory_storage() {
        exercise_backend(&MemoryStorage::new());
    }

    #[test]
    fn test_disk_storage() {
        let dir = tempfile::tempdir().unwrap();
        exercise_backend(&DiskStorage::new(dir.path().to_path_buf()).unwrap());
    }

    #[test]
    fn test_disk_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = DiskStorage::new(dir.path().to_path_buf()).unwrap();
            storage.put("criyago-static-v2.0", &key("/offline.html"), entry("offline")).unwrap();
        }
        let storage = DiskStorage::new(dir.path().to_path_buf()).unwrap();
        let hit = storage.lookup_any(&key("/offline.html")).unwrap().unwrap();
        assert_eq!(hit.data.body_text(), "offline");
    }

    #[test]
    fn test_corrupt_partition_does_not_hide_other_hits() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().to_path_buf()).unwrap();
        storage.put("criyago-static-v1.0", &key("/"), entry("home v1")).unwrap();
        storage.put("criyago-static-v2.0", &key("/"), entry("home v2")).unwrap();
        std::fs::write(dir.path().join("criyago-static-v1.0.json"), "{not json").unwrap();

        let hit = storage.lookup_any(&key("/")).unwrap().unwrap();
        assert_eq!(hit.data.body_text(), "home v2");
        assert!(storage.lookup_any(&key("/missing")).unwrap().is_none());
    }

    #[test]
    fn test_disk_storage_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::new(dir.path().to_path_buf()).unwrap();
        assert!(matches!(storage.open("../escape"), Err(CacheError::Storage(_))));
    }
}
