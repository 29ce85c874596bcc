// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable client-side storage backends.

pub mod traits;
pub mod memory;
pub mod file;

pub use traits::{
    load_json, save_json, KeyValueStorage, StorageError, CACHE_STORAGE_KEY, DISMISSED_POPUPS_KEY,
    SEARCH_CACHE_KEY,
};
pub use memory::InMemoryStorage;
pub use file::FileStorage;
