// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! TTL cache with insertion-order eviction and optional durable mirroring.
//!
//! # Semantics
//!
//! - Entries expire `ttl` after they were set; an expired entry is treated as
//!   absent and is removed lazily by the read that notices it.
//! - Capacity is bounded by `max_size`. Inserting a new key at capacity evicts
//!   the oldest-inserted key (not the least recently used one).
//! - With a storage key configured, the whole map is written to durable storage
//!   after every mutation. A quota failure triggers [`TtlCache::cleanup`] and one
//!   retry; anything else is logged and dropped.
//!
//! ```
//! use pharmalink_explorer::cache::{TtlCache, TtlCacheConfig};
//! use std::time::Duration;
//!
//! let cache: TtlCache<String> = TtlCache::in_memory(TtlCacheConfig {
//!     name: "example".into(),
//!     default_ttl: Duration::from_secs(60),
//!     max_size: 2,
//!     storage_key: None,
//! });
//!
//! cache.set("a", "1".to_string(), None);
//! cache.set("b", "2".to_string(), None);
//! cache.set("c", "3".to_string(), None); // evicts "a"
//!
//! assert!(cache.get("a").is_none());
//! assert_eq!(cache.get("c").as_deref(), Some("3"));
//! ```

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::now_millis;
use crate::storage::{load_json, save_json, KeyValueStorage, StorageError, CACHE_STORAGE_KEY};

/// A cached value with its write and expiry timestamps (epoch millis).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<V> {
    pub data: V,
    pub timestamp: u64,
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    fn new(data: V, ttl: Duration) -> Self {
        let now = now_millis();
        Self {
            data,
            timestamp: now,
            expires_at: now.saturating_add(ttl.as_millis() as u64),
        }
    }

    #[must_use]
    pub fn is_expired_at(&self, now: u64) -> bool {
        now > self.expires_at
    }
}

/// Cache sizing, lifetime and persistence settings.
#[derive(Debug, Clone)]
pub struct TtlCacheConfig {
    /// Label used in logs and metrics
    pub name: String,
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Maximum number of entries
    pub max_size: usize,
    /// Durable storage key; `None` keeps the cache process-local
    pub storage_key: Option<String>,
}

impl TtlCacheConfig {
    /// General purpose cache: 5 minutes, 50 entries.
    #[must_use]
    pub fn global() -> Self {
        Self {
            name: "global".into(),
            default_ttl: Duration::from_secs(5 * 60),
            max_size: 50,
            storage_key: Some(CACHE_STORAGE_KEY.to_string()),
        }
    }

    /// Configuration payloads: 30 minutes, 10 entries.
    #[must_use]
    pub fn config() -> Self {
        Self {
            name: "config".into(),
            default_ttl: Duration::from_secs(30 * 60),
            max_size: 10,
            storage_key: Some(format!("{}_config", CACHE_STORAGE_KEY)),
        }
    }

    /// Product documents: 10 minutes, 30 entries.
    #[must_use]
    pub fn data() -> Self {
        Self {
            name: "data".into(),
            default_ttl: Duration::from_secs(10 * 60),
            max_size: 30,
            storage_key: Some(format!("{}_data", CACHE_STORAGE_KEY)),
        }
    }

    /// Request-level response cache. Never persisted.
    #[must_use]
    pub fn request(ttl: Duration) -> Self {
        Self {
            name: "request".into(),
            default_ttl: ttl,
            max_size: 100,
            storage_key: None,
        }
    }
}

impl Default for TtlCacheConfig {
    fn default() -> Self {
        Self::global()
    }
}

/// Cache statistics. Observability only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hit rate (0.0 - 1.0)
    pub hit_rate: f64,
    /// Rough size estimate: serialized byte length of all entries
    pub memory_usage: usize,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion order for eviction (oldest first)
    order: VecDeque<String>,
}

impl<V> Inner<V> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.order.retain(|k| k != key);
        }
        removed
    }

    fn sweep(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let entries = &self.entries;
        self.order.retain(|k| entries.contains_key(k));
        before - self.entries.len()
    }
}

/// Generic key → value cache with expiry and capacity eviction.
pub struct TtlCache<V> {
    config: TtlCacheConfig,
    inner: Mutex<Inner<V>>,
    storage: Option<Arc<dyn KeyValueStorage>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> TtlCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Create a cache, loading non-expired entries from `storage` when the
    /// config names a storage key.
    pub fn new(config: TtlCacheConfig, storage: Option<Arc<dyn KeyValueStorage>>) -> Self {
        let cache = Self {
            config,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            storage,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };
        cache.load_from_storage();
        cache
    }

    /// Create a cache that never touches durable storage.
    pub fn in_memory(config: TtlCacheConfig) -> Self {
        Self::new(config, None)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// Store `value` under `key` with `ttl` (or the configured default).
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let ttl = ttl.filter(|t| !t.is_zero()).unwrap_or(self.config.default_ttl);
        let max_size = self.config.max_size.max(1);
        let mut inner = self.inner.lock();

        let is_new = !inner.entries.contains_key(key);
        if is_new {
            let mut evicted = 0;
            while inner.entries.len() >= max_size {
                let Some(oldest) = inner.order.pop_front() else {
                    break;
                };
                inner.entries.remove(&oldest);
                evicted += 1;
                debug!(cache = %self.config.name, key = %oldest, "Evicted oldest entry");
            }
            if evicted > 0 {
                crate::metrics::record_cache_eviction(&self.config.name, evicted);
            }
            inner.order.push_back(key.to_string());
        }

        inner.entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        crate::metrics::set_cache_entries(&self.config.name, inner.entries.len());
        self.persist(&mut inner);
    }

    /// Get a live value. Expired entries are removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        let now = now_millis();

        let expired = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                crate::metrics::record_cache_lookup(&self.config.name, "hit");
                return Some(entry.data.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.remove(key);
            debug!(cache = %self.config.name, key = %key, "Entry expired on read");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        crate::metrics::record_cache_lookup(&self.config.name, "miss");
        None
    }

    /// Same expiry semantics as [`get`](Self::get) without cloning the value.
    pub fn has(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let now = now_millis();

        match inner.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => true,
            Some(_) => {
                inner.remove(key);
                false
            }
            None => false,
        }
    }

    /// Remove `key`. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.remove(key).is_some();
        self.persist(&mut inner);
        removed
    }

    /// Drop every entry and the persisted snapshot.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.order.clear();
        crate::metrics::set_cache_entries(&self.config.name, 0);

        if let (Some(storage), Some(key)) = (&self.storage, &self.config.storage_key) {
            if let Err(e) = storage.remove_item(key) {
                warn!(cache = %self.config.name, error = %e, "Failed to remove persisted cache");
            }
        }
    }

    /// Remove all expired entries. Returns how many were removed.
    pub fn cleanup(&self) -> usize {
        let mut inner = self.inner.lock();
        let removed = inner.sweep(now_millis());
        if removed > 0 {
            debug!(cache = %self.config.name, removed, "Expired entries removed");
            crate::metrics::set_cache_entries(&self.config.name, inner.entries.len());
            self.persist(&mut inner);
        }
        removed
    }

    /// Keys in insertion order, including entries that expired but were not yet swept.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().order.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let now = now_millis();
        let expired_entries = inner.entries.values().filter(|e| e.is_expired_at(now)).count();
        let memory_usage = serde_json::to_string(&Self::snapshot(&inner))
            .map(|s| s.len())
            .unwrap_or(0);

        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            total_entries: inner.entries.len(),
            valid_entries: inner.entries.len() - expired_entries,
            expired_entries,
            hits,
            misses,
            hit_rate: if total > 0 { hits as f64 / total as f64 } else { 0.0 },
            memory_usage,
        }
    }

    fn snapshot(inner: &Inner<V>) -> Vec<(&String, &CacheEntry<V>)> {
        inner
            .order
            .iter()
            .filter_map(|k| inner.entries.get_key_value(k))
            .collect()
    }

    fn write_snapshot(
        storage: &dyn KeyValueStorage,
        key: &str,
        inner: &Inner<V>,
    ) -> Result<(), StorageError> {
        save_json(storage, key, &Self::snapshot(inner))
    }

    fn persist(&self, inner: &mut Inner<V>) {
        let (Some(storage), Some(key)) = (&self.storage, &self.config.storage_key) else {
            return;
        };

        match Self::write_snapshot(storage.as_ref(), key, inner) {
            Ok(()) => {}
            Err(e) if e.is_quota() => {
                warn!(cache = %self.config.name, error = %e, "Storage full, sweeping expired entries");
                inner.sweep(now_millis());
                if let Err(e) = Self::write_snapshot(storage.as_ref(), key, inner) {
                    error!(cache = %self.config.name, error = %e, "Failed to persist cache after cleanup");
                    crate::metrics::record_persist_failure(&self.config.name);
                }
            }
            Err(e) => {
                warn!(cache = %self.config.name, error = %e, "Failed to persist cache");
                crate::metrics::record_persist_failure(&self.config.name);
            }
        }
    }

    fn load_from_storage(&self) {
        let (Some(storage), Some(key)) = (&self.storage, &self.config.storage_key) else {
            return;
        };

        let stored: Vec<(String, CacheEntry<V>)> = match load_json(storage.as_ref(), key) {
            Ok(Some(stored)) => stored,
            Ok(None) => return,
            Err(e) => {
                warn!(cache = %self.config.name, error = %e, "Failed to load cache from storage");
                return;
            }
        };

        let now = now_millis();
        let mut inner = self.inner.lock();
        for (k, entry) in stored {
            if entry.is_expired_at(now) || inner.entries.contains_key(&k) {
                continue;
            }
            inner.order.push_back(k.clone());
            inner.entries.insert(k, entry);
        }
        debug!(cache = %self.config.name, loaded = inner.entries.len(), "Cache restored from storage");
    }
}
