// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Client-side caches.

mod ttl_cache;

pub use ttl_cache::{CacheEntry, CacheStats, TtlCache, TtlCacheConfig};

/// Wall clock in epoch millis. Persisted timestamps must survive restarts,
/// so `Instant` is not usable here.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
