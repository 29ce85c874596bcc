// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use thiserror::Error;

/// Storage key for the aggregate TTL cache blob.
pub const CACHE_STORAGE_KEY: &str = "pharmalink_cache";
/// Storage key for the list of dismissed popup ids.
pub const DISMISSED_POPUPS_KEY: &str = "pharmalink_dismissed_popups";
/// Storage key for the search history blob.
pub const SEARCH_CACHE_KEY: &str = "pharmalink_search_cache";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage quota exceeded: needed {needed} bytes, {available} available")]
    QuotaExceeded {
        needed: usize,
        available: usize,
    },
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Quota failures are recoverable by freeing space and retrying.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Durable client-side key/value storage.
///
/// Mirrors the browser's local storage contract: string keys, string values,
/// synchronous access. Callers treat every failure as best-effort.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// Read and deserialize a JSON value. Missing keys yield `Ok(None)`.
    fn get_json<T>(&self, key: &str) -> Result<Option<T>, StorageError>
    where
        T: serde::de::DeserializeOwned,
        Self: Sized,
    {
        match self.get_item(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

/// JSON helpers usable through `dyn KeyValueStorage`.
pub fn load_json<T>(storage: &dyn KeyValueStorage, key: &str) -> Result<Option<T>, StorageError>
where
    T: serde::de::DeserializeOwned,
{
    match storage.get_item(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub fn save_json<T>(storage: &dyn KeyValueStorage, key: &str, value: &T) -> Result<(), StorageError>
where
    T: serde::Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    storage.set_item(key, &raw)
}
