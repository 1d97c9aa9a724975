//! # Persisted Client State
//!
//! Key/value storage for the bearer token, the cached user blob and the
//! per-user watchlist cache. [`MemoryStore`] is used in tests and for
//! ephemeral sessions, [`FileStore`] keeps a JSON file on disk so a session
//! survives restarts.
//!
//! [`TtlCache`] layers timestamped entries over any [`KeyValueStore`]:
//!
//! ```text
//! watchlists_cache_42 = {"stored_at_ms": 1718000000000, "value": [...]}
//! ```

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::error::{AppError, Result};
use crate::core::service::{Clock, KeyValueStore};

/// Bearer token key
pub const TOKEN_KEY: &str = "auth_token";
/// Serialized [`shared::User`] key
pub const USER_KEY: &str = "auth_user";
/// Prefix of per-user watchlist cache entries
pub const WATCHLIST_CACHE_PREFIX: &str = "watchlists_cache_";

pub fn watchlist_cache_key(user_id: i64) -> String {
    format!("{}{}", WATCHLIST_CACHE_PREFIX, user_id)
}

/// In-memory store; contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

/// JSON-file backed store.
///
/// The whole map is rewritten on every mutation through a temporary file and
/// a rename, so a crash mid-write never leaves a truncated file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A corrupt file is logged and treated as empty rather than failing the
    /// whole client start-up.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Storage file corrupt, starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened storage file");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            AppError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    stored_at_ms: i64,
    value: T,
}

/// Timestamped entries over a [`KeyValueStore`].
///
/// An entry is fresh while `now - stored_at < ttl`. Expired or unreadable
/// entries are removed on read.
#[derive(Clone)]
pub struct TtlCache {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl TtlCache {
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { storage, clock, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "Dropping unreadable cache entry");
                self.invalidate(key);
                return None;
            }
        };

        let age_ms = self.clock.now_ms().saturating_sub(entry.stored_at_ms);
        if age_ms < 0 || age_ms as u128 >= self.ttl.as_millis() {
            tracing::debug!(key, age_ms, "Cache entry expired");
            self.invalidate(key);
            return None;
        }

        tracing::debug!(key, age_ms, "Cache hit");
        Some(entry.value)
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let entry = CacheEntry {
            stored_at_ms: self.clock.now_ms(),
            value,
        };
        self.storage.set(key, &serde_json::to_string(&entry)?)
    }

    pub fn invalidate(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            tracing::warn!(key, error = %e, "Cache invalidation failed");
        }
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) {
        match self.storage.keys() {
            Ok(keys) => keys
                .iter()
                .filter(|key| key.starts_with(prefix))
                .for_each(|key| self.invalidate(key)),
            Err(e) => tracing::warn!(prefix, error = %e, "Cache prefix invalidation failed"),
        }
    }
}
