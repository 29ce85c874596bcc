// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The explorer service container.
//!
//! [`Explorer`] wires every data-layer service once at startup and hands out
//! shared handles. Nothing in the crate is a global.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──start()──→ Running ──shutdown()──→ Stopped
//! ```
//!
//! `start()` spawns the periodic cache sweep and, when enabled, the idle
//! preload. `shutdown()` aborts every background task. Lookups work in any
//! state; only background work depends on the lifecycle.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{TtlCache, TtlCacheConfig};
use crate::client::{ApiClient, HttpTransport};
use crate::config::ExplorerConfig;
use crate::data::{
    BackendVersion, DataResponse, DataService, HistoryResponse, HistoryService, VersionService,
};
use crate::extract::{
    extract_delivery_chains, extract_meta_popups, DeliveryChain, DeliveryStatus,
    DeliveryStatusPolicy, DismissedPopups, MetaPopup,
};
use crate::metrics;
use crate::preload::{PreloadStats, Preloader};
use crate::search::{search_json, SearchResult, SearchSuggestion, SearchSuggestionCache};
use crate::storage::KeyValueStorage;

/// Units of an opened document that are warmed in the background.
const OPEN_PRELOAD_UNITS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorerState {
    Created,
    Running,
    Stopped,
}

impl std::fmt::Display for ExplorerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Running => write!(f, "Running"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Everything needed to display one product.
#[derive(Debug, Clone, Serialize)]
pub struct Passport {
    /// The id the document was found under
    pub id: String,
    pub response: DataResponse,
    /// Popups not yet dismissed, highest priority first
    pub popups: Vec<MetaPopup>,
    pub chains: Vec<DeliveryChain>,
}

pub struct Explorer {
    config: Arc<ExplorerConfig>,
    client: Arc<ApiClient>,
    data: Arc<DataService>,
    preloader: Arc<Preloader>,
    history: HistoryService,
    versions: VersionService,
    suggestions: SearchSuggestionCache,
    dismissed: DismissedPopups,
    delivery_policy: DeliveryStatusPolicy,
    state: watch::Sender<ExplorerState>,
    state_rx: watch::Receiver<ExplorerState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Explorer {
    /// Build all services. `storage` backs the data cache, search history and
    /// dismissed popups.
    pub fn new(
        config: ExplorerConfig,
        storage: Arc<dyn KeyValueStorage>,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let config = Arc::new(config);
        let source = config.data_source();
        info!(source = ?source, environment = ?config.app.environment, "Building explorer");

        let data_cache = Arc::new(TtlCache::<DataResponse>::new(
            TtlCacheConfig::data(),
            Some(Arc::clone(&storage)),
        ));
        let client = Arc::new(ApiClient::new(transport, Arc::clone(&config)));
        let data = Arc::new(DataService::new(Arc::clone(&client), source, data_cache));
        let preloader = Preloader::new(Arc::clone(&data), config.preload.clone());
        let delivery_policy = DeliveryStatusPolicy {
            in_transit_window: Duration::from_secs(
                config.maintenance.delivery_in_transit_hours.saturating_mul(60 * 60),
            ),
        };
        let (state_tx, state_rx) = watch::channel(ExplorerState::Created);

        Self {
            history: HistoryService::new(Arc::clone(&client), source),
            versions: VersionService::new(Arc::clone(&client)),
            suggestions: SearchSuggestionCache::new(Some(Arc::clone(&storage))),
            dismissed: DismissedPopups::new(storage),
            config,
            client,
            data,
            preloader,
            delivery_policy,
            state: state_tx,
            state_rx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn state(&self) -> ExplorerState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ExplorerState> {
        self.state_rx.clone()
    }

    fn set_state(&self, state: ExplorerState) {
        let _ = self.state.send(state);
        metrics::set_explorer_state(&state.to_string());
    }

    /// Spawn background maintenance and the idle preload.
    pub fn start(&self) {
        if self.state() != ExplorerState::Created {
            warn!(state = %self.state(), "Explorer already started");
            return;
        }

        let interval_secs = self.config.maintenance.cleanup_interval_secs;
        if interval_secs > 0 {
            let data = Arc::clone(&self.data);
            let handle = tokio::spawn(async move {
                let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
                // First tick completes immediately
                interval.tick().await;
                loop {
                    interval.tick().await;
                    let removed = data.cache().cleanup();
                    if removed > 0 {
                        debug!(removed, "Swept expired data cache entries");
                    }
                }
            });
            self.tasks.lock().push(handle);
        }

        if self.config.preload.preload_on_idle {
            self.preloader
                .schedule_start(Duration::from_millis(self.config.preload.idle_delay_ms));
        }

        self.set_state(ExplorerState::Running);
        info!(cleanup_interval_secs = interval_secs, "Explorer running");
    }

    /// Abort background work. Lookups keep working afterwards.
    pub fn shutdown(&self) {
        if self.state() == ExplorerState::Stopped {
            return;
        }
        self.preloader.cancel_pending();
        for handle in self.tasks.lock().drain(..) {
            handle.abort();
        }
        self.set_state(ExplorerState::Stopped);
        info!("Explorer stopped");
    }

    /// Load a product for display and warm its linked ids in the background.
    #[tracing::instrument(skip(self))]
    pub async fn open(&self, id: &str) -> Passport {
        let response = self.data.get_data_by_id(id).await;
        let resolved = response.resolved_id(id).to_string();

        let (popups, chains) = match &response.data {
            Some(document) => (
                self.dismissed.visible(extract_meta_popups(document)),
                extract_delivery_chains(document),
            ),
            None => (Vec::new(), Vec::new()),
        };

        if let Some(linked) = &response.linked_ids {
            let ids: Vec<String> = linked
                .preload_candidates(OPEN_PRELOAD_UNITS)
                .into_iter()
                .filter(|linked_id| *linked_id != resolved)
                .collect();
            if !ids.is_empty() {
                let preloader = Arc::clone(&self.preloader);
                let handle = tokio::spawn(async move {
                    preloader.force_preload(&ids).await;
                });
                let mut tasks = self.tasks.lock();
                tasks.retain(|task| !task.is_finished());
                tasks.push(handle);
            }
        }

        Passport {
            id: resolved,
            response,
            popups,
            chains,
        }
    }

    /// Search a document and record the query in the search history.
    pub fn search(&self, document: &Value, query: &str) -> Vec<SearchResult> {
        let results = search_json(document, query);
        if self.config.features.search_history && !query.trim().is_empty() {
            self.suggestions
                .add_search(query.trim(), results.len(), !results.is_empty());
        }
        results
    }

    #[must_use]
    pub fn suggestions(&self, query: &str, limit: usize) -> Vec<SearchSuggestion> {
        self.suggestions.suggestions(query, limit)
    }

    pub async fn key_history(&self, product_id: &str, key_path: &str) -> HistoryResponse {
        self.history.fetch_key_history(product_id, key_path).await
    }

    pub async fn backend_version(&self) -> BackendVersion {
        self.versions.fetch_backend_version().await
    }

    pub fn dismiss_popup(&self, popup_id: &str) {
        self.dismissed.dismiss(popup_id);
    }

    #[must_use]
    pub fn delivery_status(&self, timestamp: &str) -> DeliveryStatus {
        self.delivery_policy.status(timestamp, Utc::now())
    }

    /// Hover/focus hint for a link.
    pub fn hint_link(&self, href: Option<&str>, preload_id: Option<&str>) -> Option<String> {
        self.preloader.queue_from_link(href, preload_id)
    }

    #[must_use]
    pub fn preload_stats(&self) -> PreloadStats {
        self.preloader.stats()
    }

    #[must_use]
    pub fn config(&self) -> &Arc<ExplorerConfig> {
        &self.config
    }

    #[must_use]
    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    #[must_use]
    pub fn data(&self) -> &Arc<DataService> {
        &self.data
    }

    #[must_use]
    pub fn preloader(&self) -> &Arc<Preloader> {
        &self.preloader
    }

    #[must_use]
    pub fn search_history(&self) -> &SearchSuggestionCache {
        &self.suggestions
    }

    #[must_use]
    pub fn dismissed_popups(&self) -> &DismissedPopups {
        &self.dismissed
    }
}

impl Drop for Explorer {
    fn drop(&mut self) {
        for handle in self.tasks.get_mut().drain(..) {
            handle.abort();
        }
    }
}
