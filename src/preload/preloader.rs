// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use futures::future::{join_all, BoxFuture, FutureExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStats;
use crate::config::PreloadConfig;
use crate::data::{DataService, LOCAL_DATA_TTL};
use crate::metrics;

/// Units of a loaded document that are followed.
const LINKED_UNITS: usize = 2;
/// Linked ids preloaded per document.
const LINKED_FANOUT: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadStats {
    pub preloaded_count: usize,
    pub queue_size: usize,
    pub is_preloading: bool,
    pub cache_stats: CacheStats,
}

#[derive(Default)]
struct PreloadState {
    /// Pending ids, insertion ordered, no duplicates
    queue: Vec<String>,
    preloaded: HashSet<String>,
}

/// Background cache warmer for the data service.
pub struct Preloader {
    data: Arc<DataService>,
    config: PreloadConfig,
    state: Mutex<PreloadState>,
    running: AtomicBool,
    debounce: Mutex<Option<JoinHandle<()>>>,
    idle: Mutex<Option<JoinHandle<()>>>,
}

impl Preloader {
    pub fn new(data: Arc<DataService>, config: PreloadConfig) -> Arc<Self> {
        Arc::new(Self {
            data,
            config,
            state: Mutex::new(PreloadState::default()),
            running: AtomicBool::new(false),
            debounce: Mutex::new(None),
            idle: Mutex::new(None),
        })
    }

    fn linked_depth(&self) -> u8 {
        self.config.linked_data_depth.min(1)
    }

    fn is_warm(&self, id: &str) -> bool {
        self.state.lock().preloaded.contains(id) || self.data.is_cached(id)
    }

    /// Queue `id` for a debounced background load.
    ///
    /// Returns `false` when the id is already cached or preloaded.
    pub fn queue_preload(self: &Arc<Self>, id: &str) -> bool {
        if id.is_empty() || self.is_warm(id) {
            return false;
        }

        let queued = {
            let mut state = self.state.lock();
            if !state.queue.iter().any(|q| q == id) {
                state.queue.push(id.to_string());
            }
            state.queue.len()
        };
        metrics::set_preload_queue(queued);

        if !self.running.load(Ordering::Acquire) {
            self.schedule_drain();
        }
        true
    }

    /// Queue the id behind a hovered or focused link.
    ///
    /// An `href` of the form `/<id>` wins over an explicit preload id.
    pub fn queue_from_link(self: &Arc<Self>, href: Option<&str>, preload_id: Option<&str>) -> Option<String> {
        let id = match href {
            Some(href) if href.len() > 1 && href.starts_with('/') => &href[1..],
            _ => preload_id.filter(|id| !id.is_empty())?,
        };
        self.queue_preload(id).then(|| id.to_string())
    }

    /// Restart the debounce timer; the last scheduled drain wins.
    fn schedule_drain(self: &Arc<Self>) {
        let delay = Duration::from_millis(self.config.debounce_ms);
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !this.running.load(Ordering::Acquire) {
                this.process_queue().await;
            }
        });
        if let Some(previous) = self.debounce.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Start preloading after `delay` (idle start). Replaces a pending one.
    pub fn schedule_start(self: &Arc<Self>, delay: Duration) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.start_preloading().await;
        });
        if let Some(previous) = self.idle.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Abort pending debounce and idle timers. Queued ids stay queued.
    pub fn cancel_pending(&self) {
        for slot in [&self.debounce, &self.idle] {
            if let Some(handle) = slot.lock().take() {
                handle.abort();
            }
        }
    }

    /// Warm the common ids, then drain the queue. Ignored while running.
    pub async fn start_preloading(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("Preloading already running");
            return;
        }
        info!(common = self.config.common_ids.len(), "Preloading started");

        let common: Vec<String> = self
            .config
            .common_ids
            .iter()
            .filter(|id| !self.is_warm(id))
            .cloned()
            .collect();
        let depth = self.linked_depth();
        join_all(common.into_iter().map(|id| self.preload_single(id, depth))).await;

        self.process_queue().await;
        self.running.store(false, Ordering::Release);

        let stats = self.stats();
        info!(preloaded = stats.preloaded_count, queued = stats.queue_size, "Preloading finished");
    }

    /// Drain one batch of at most `max_concurrent` ids. Anything left over is
    /// rescheduled.
    async fn process_queue(self: &Arc<Self>) {
        let batch: Vec<String> = {
            let mut state = self.state.lock();
            let pending = std::mem::take(&mut state.queue);
            let mut batch = Vec::new();
            for id in pending {
                if state.preloaded.contains(&id) || self.data.is_cached(&id) {
                    continue;
                }
                if batch.len() < self.config.max_concurrent.max(1) {
                    batch.push(id);
                } else {
                    state.queue.push(id);
                }
            }
            batch
        };
        let leftover = self.state.lock().queue.len();
        metrics::set_preload_queue(leftover);

        if batch.is_empty() {
            return;
        }
        debug!(batch = batch.len(), leftover, "Draining preload queue");
        let depth = self.linked_depth();
        join_all(batch.into_iter().map(|id| self.preload_single(id, depth))).await;

        if leftover > 0 {
            self.schedule_drain();
        }
    }

    /// Load the given ids now, bypassing the queue and the concurrency cap.
    pub async fn force_preload(&self, ids: &[String]) {
        let depth = self.linked_depth();
        join_all(ids.iter().cloned().map(|id| self.preload_single(id, depth))).await;
    }

    fn preload_single(&self, id: String, depth: u8) -> BoxFuture<'_, ()> {
        async move {
            debug!(id = %id, "Preloading");
            let response = self.data.get_data_by_id(&id).await;

            if !response.has_data() {
                metrics::record_preload("miss");
                warn!(
                    id = %id,
                    error = response.error.as_deref().unwrap_or("no data"),
                    "Preload failed"
                );
                return;
            }

            self.data.store(&id, &response, LOCAL_DATA_TTL);
            self.state.lock().preloaded.insert(id.clone());
            metrics::record_preload("success");

            let Some(linked) = response.linked_ids.as_ref().filter(|_| depth > 0) else {
                return;
            };
            let next: Vec<String> = linked
                .preload_candidates(LINKED_UNITS)
                .into_iter()
                .filter(|candidate| !self.is_warm(candidate))
                .take(LINKED_FANOUT)
                .collect();
            if !next.is_empty() {
                debug!(id = %id, linked = ?next, "Preloading linked ids");
                join_all(next.into_iter().map(|linked_id| self.preload_single(linked_id, depth - 1))).await;
            }
        }
        .boxed()
    }

    #[must_use]
    pub fn stats(&self) -> PreloadStats {
        let (preloaded_count, queue_size) = {
            let state = self.state.lock();
            (state.preloaded.len(), state.queue.len())
        };
        PreloadStats {
            preloaded_count,
            queue_size,
            is_preloading: self.running.load(Ordering::Acquire),
            cache_stats: self.data.cache().stats(),
        }
    }

    #[must_use]
    pub fn is_preloaded(&self, id: &str) -> bool {
        self.state.lock().preloaded.contains(id)
    }
}
