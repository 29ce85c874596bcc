// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use dashmap::DashMap;
use parking_lot::Mutex;
use super::traits::{KeyValueStorage, StorageError};

/// Process-local storage, optionally bounded by a byte quota.
///
/// The quota counts value bytes only, which is close enough to how browsers
/// account local storage for the recovery paths that depend on it.
pub struct InMemoryStorage {
    data: DashMap<String, String>,
    quota_bytes: Option<usize>,
    /// Serializes quota accounting with the write it guards
    write_lock: Mutex<()>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
            quota_bytes: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Storage that rejects writes once stored values exceed `quota_bytes`.
    #[must_use]
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::new()
        }
    }

    /// Get current key count
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total bytes held in values
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.data.iter().map(|e| e.value().len()).sum()
    }

    /// Clear all keys
    pub fn clear(&self) {
        self.data.clear();
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.data.get(key).map(|r| r.value().clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();

        if let Some(quota) = self.quota_bytes {
            let existing = self.data.get(key).map_or(0, |r| r.value().len());
            let available = quota.saturating_sub(self.used_bytes() - existing);
            if value.len() > available {
                return Err(StorageError::QuotaExceeded {
                    needed: value.len(),
                    available,
                });
            }
        }

        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::{load_json, save_json};

    #[test]
    fn test_new_storage_is_empty() {
        let storage = InMemoryStorage::new();
        assert!(storage.is_empty());
        assert_eq!(storage.len(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let storage = InMemoryStorage::new();
        storage.set_item("k", "v").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let storage = InMemoryStorage::new();
        assert!(storage.get_item("missing").unwrap().is_none());
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let storage = InMemoryStorage::new();
        assert!(storage.remove_item("missing").is_ok());
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let storage = InMemoryStorage::with_quota(10);
        storage.set_item("a", "12345").unwrap();

        let err = storage.set_item("b", "1234567").unwrap_err();
        assert!(err.is_quota());

        // Overwriting an existing key only counts the delta
        storage.set_item("a", "1234567890").unwrap();
        assert_eq!(storage.used_bytes(), 10);
    }

    #[test]
    fn test_json_helpers() {
        let storage = InMemoryStorage::new();
        save_json(&storage, "ids", &vec!["a", "b"]).unwrap();

        let ids: Option<Vec<String>> = load_json(&storage, "ids").unwrap();
        assert_eq!(ids, Some(vec!["a".to_string(), "b".to_string()]));

        let typed: Option<Vec<String>> = storage.get_json("ids").unwrap();
        assert_eq!(typed.map(|v| v.len()), Some(2));
    }

    #[test]
    fn test_corrupt_json_is_error() {
        let storage = InMemoryStorage::new();
        storage.set_item("ids", "{not json").unwrap();
        let result: Result<Option<Vec<String>>, _> = load_json(&storage, "ids");
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }
}
