//! Short-lived session cache. Every fault is logged and turned into a miss.

use std::collections::HashMap;
use std::fs::{DirBuilder, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::DataMode;

pub const DATA_TTL: Duration = Duration::from_secs(90);
pub const OBJECTS_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
pub enum CacheFault {
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Milliseconds since the epoch at write time
    #[serde(rename = "ts")]
    pub stored_at: i64,
    pub value: T,
}

/// Raw key/value storage behind [`SessionCache`].
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheFault>;
    fn set(&self, key: &str, raw: String) -> Result<(), CacheFault>;
    /// Removing a missing key is not a fault.
    fn remove(&self, key: &str) -> Result<(), CacheFault>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheFault> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, raw: String) -> Result<(), CacheFault> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), raw);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheFault> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside `dir`. On Unix the directory is created 0700
/// and entries are written 0600.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheFault> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, raw: String) -> Result<(), CacheFault> {
        create_private_dir(&self.dir)?;
        let mut file = open_private_file(&self.path_for(key))?;
        file.write_all(raw.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheFault> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    DirBuilder::new().recursive(true).create(dir)
}

#[cfg(unix)]
fn open_private_file(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten files left by older runs too.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create(true).truncate(true).open(path)
}

pub struct SessionCache {
    store: Box<dyn CacheStore>,
}

impl SessionCache {
    pub fn new(store: impl CacheStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    pub fn on_disk(dir: impl Into<PathBuf>) -> Self {
        Self::new(FileStore::new(dir))
    }

    /// Whether an entry is stored under `key`, without checking its age.
    pub fn contains(&self, key: &str) -> bool {
        matches!(self.store.get(key), Ok(Some(_)))
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        self.read_at(key, ttl, Utc::now())
    }

    pub fn read_at<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Option<T> {
        match self.try_read::<T>(key) {
            Ok(Some(entry)) => {
                let age = now.timestamp_millis() - entry.stored_at;
                if age <= ttl.as_millis() as i64 {
                    debug!(key, age_ms = age, "cache hit");
                    Some(entry.value)
                } else {
                    debug!(key, age_ms = age, "cache entry expired");
                    if let Err(fault) = self.store.remove(key) {
                        warn!(key, error = %fault, "failed to remove expired cache entry");
                    }
                    None
                }
            }
            Ok(None) => {
                debug!(key, "cache miss");
                None
            }
            Err(fault) => {
                warn!(key, error = %fault, "cache read failed, treating as miss");
                None
            }
        }
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        self.write_at(key, value, Utc::now());
    }

    pub fn write_at<T: Serialize>(&self, key: &str, value: &T, now: DateTime<Utc>) {
        let entry = CacheEntry {
            stored_at: now.timestamp_millis(),
            value,
        };
        let result = serde_json::to_string(&entry)
            .map_err(CacheFault::from)
            .and_then(|raw| self.store.set(key, raw));
        if let Err(fault) = result {
            warn!(key, error = %fault, "cache write failed");
        }
    }

    fn try_read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheFault> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

/// Stable per-user namespace derived from the tail of the token.
pub fn token_namespace(token: &str) -> String {
    if token.is_empty() {
        return "anon".to_string();
    }
    let count = token.chars().count();
    token.chars().skip(count.saturating_sub(24)).collect()
}

pub fn profile_data_key(namespace: &str, mode: DataMode) -> String {
    format!("profile-data:{namespace}:{}", mode.as_str())
}

pub fn object_map_key(namespace: &str) -> String {
    format!("object-map:{namespace}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::{json, Value};

    #[test]
    fn value_round_trips_before_expiry() {
        let cache = SessionCache::in_memory();
        let now = Utc::now();
        let value = json!({ "total": 2000, "names": ["a", "b"] });
        cache.write_at("k", &value, now);

        let read: Option<Value> = cache.read_at("k", DATA_TTL, now + ChronoDuration::seconds(10));
        assert_eq!(read, Some(value));
    }

    #[test]
    fn entry_at_exactly_ttl_is_still_valid() {
        let cache = SessionCache::in_memory();
        let now = Utc::now();
        cache.write_at("k", &1u32, now);
        let read: Option<u32> = cache.read_at("k", DATA_TTL, now + ChronoDuration::seconds(90));
        assert_eq!(read, Some(1));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let cache = SessionCache::in_memory();
        let now = Utc::now();
        cache.write_at("k", &1u32, now);
        let read: Option<u32> =
            cache.read_at("k", DATA_TTL, now + ChronoDuration::milliseconds(90_001));
        assert_eq!(read, None);
        assert!(!cache.contains("k"));
    }

    #[test]
    fn expired_file_entry_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::on_disk(dir.path());
        let written = Utc::now() - ChronoDuration::hours(5);
        cache.write_at("profile-data:ns:full", &json!({ "user": [] }), written);
        cache.write("object-map:ns", &json!({}));

        assert_eq!(cache.read::<Value>("profile-data:ns:full", DATA_TTL), None);
        assert!(!dir.path().join("profile-data_ns_full.json").exists());
        assert!(dir.path().join("object-map_ns.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("xp-dashboard");
        let cache = SessionCache::on_disk(&root);
        cache.write("object-map:ns", &json!({ "1": { "name": "go-reloaded" } }));

        let mode = |path: &Path| std::fs::metadata(path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&root), 0o700);
        assert_eq!(mode(&root.join("object-map_ns.json")), 0o600);

        // a file left world-readable is tightened on the next write
        let stale = root.join("object-map_ns.json");
        std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();
        cache.write("object-map:ns", &json!({}));
        assert_eq!(mode(&stale), 0o600);
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let store = MemoryStore::default();
        store.set("k", "{not json".to_string()).unwrap();
        let cache = SessionCache::new(store);
        assert_eq!(cache.read::<Value>("k", DATA_TTL), None);
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::on_disk(dir.path().join("cache"));
        cache.write("profile-data:abc.def:full", &vec![1, 2, 3]);
        assert_eq!(
            cache.read::<Vec<i32>>("profile-data:abc.def:full", DATA_TTL),
            Some(vec![1, 2, 3])
        );
        assert_eq!(cache.read::<Vec<i32>>("object-map:abc", OBJECTS_TTL), None);
    }

    #[test]
    fn unwritable_store_degrades_to_always_miss() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();

        let cache = SessionCache::on_disk(&blocker);
        cache.write("k", &1u32);
        assert_eq!(cache.read::<u32>("k", DATA_TTL), None);
        assert!(!cache.contains("k"));
    }

    #[test]
    fn namespace_is_token_tail() {
        assert_eq!(token_namespace(""), "anon");
        assert_eq!(token_namespace("short"), "short");
        let token = "a".repeat(10) + &"b".repeat(24);
        assert_eq!(token_namespace(&token), "b".repeat(24));
    }

    #[test]
    fn keys_are_deterministic() {
        assert_eq!(profile_data_key("ns", DataMode::Projects), "profile-data:ns:projects");
        assert_eq!(object_map_key("ns"), "object-map:ns");
    }
}
