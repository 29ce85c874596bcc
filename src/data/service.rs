// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Product lookup by id.
//!
//! # Lookup Flow
//!
//! ```text
//! get_data_by_id(id)
//!   ├─ data cache "data_<id>" hit ──→ source = cache
//!   ├─ local:  exact key ─→ case-insensitive substring (first in table order)
//!   └─ api:    ApiClient::search (retry + request cache)
//!        └─ success with data ──→ data cache (local 10 min, api 5 min)
//! ```
//!
//! Failures never surface as `Err`: they are reported in [`DataResponse::error`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::demo::demo_documents;
use crate::cache::TtlCache;
use crate::client::{ApiClient, ResponseSource};
use crate::config::ResolvedSource;
use crate::extract::{
    extract_linked_ids, LinkedIds, HERSTELLER_PREFIX, MEDIKAMENT_PREFIX, UNIT_PREFIX,
};
use crate::metrics;

/// TTL for documents served from the demo table.
pub const LOCAL_DATA_TTL: Duration = Duration::from_secs(10 * 60);
/// TTL for documents fetched from the backend.
pub const REMOTE_DATA_TTL: Duration = Duration::from_secs(5 * 60);

/// Data cache key for a product id.
#[must_use]
pub fn data_cache_key(id: &str) -> String {
    format!("data_{}", id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Local,
    Api,
    Cache,
}

/// Result of a lookup. Exactly one of `data` / `error` is normally set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataResponse {
    pub data: Option<Value>,
    pub error: Option<String>,
    pub source: DataOrigin,
    pub timestamp: String,
    #[serde(default)]
    pub cached: bool,
    /// Set when the document was found under a different id than requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_ids: Option<LinkedIds>,
}

impl DataResponse {
    fn failure(source: DataOrigin, error: String, timestamp: String) -> Self {
        Self {
            data: None,
            error: Some(error),
            source,
            timestamp,
            cached: false,
            corrected_id: None,
            linked_ids: None,
        }
    }

    fn found(source: DataOrigin, data: Value, timestamp: String) -> Self {
        let linked_ids = Some(extract_linked_ids(&data));
        Self {
            data: Some(data),
            error: None,
            source,
            timestamp,
            cached: false,
            corrected_id: None,
            linked_ids,
        }
    }

    #[must_use]
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// The id the document is actually stored under.
    #[must_use]
    pub fn resolved_id<'a>(&'a self, requested: &'a str) -> &'a str {
        self.corrected_id.as_deref().unwrap_or(requested)
    }
}

pub struct DataService {
    client: Arc<ApiClient>,
    source: ResolvedSource,
    cache: Arc<TtlCache<DataResponse>>,
    demo: Vec<(&'static str, Value)>,
}

impl DataService {
    pub fn new(
        client: Arc<ApiClient>,
        source: ResolvedSource,
        cache: Arc<TtlCache<DataResponse>>,
    ) -> Self {
        Self {
            client,
            source,
            cache,
            demo: demo_documents(),
        }
    }

    #[must_use]
    pub fn source(&self) -> ResolvedSource {
        self.source
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<TtlCache<DataResponse>> {
        &self.cache
    }

    #[must_use]
    pub fn is_cached(&self, id: &str) -> bool {
        self.cache.has(&data_cache_key(id))
    }

    /// Look up a product document. Never fails; see [`DataResponse::error`].
    #[tracing::instrument(skip(self))]
    pub async fn get_data_by_id(&self, id: &str) -> DataResponse {
        let key = data_cache_key(id);
        if let Some(mut hit) = self.cache.get(&key) {
            debug!(id, "Data cache hit");
            metrics::record_lookup("cache", true);
            hit.source = DataOrigin::Cache;
            hit.cached = true;
            return hit;
        }

        let (response, ttl) = match self.source {
            ResolvedSource::Local => (self.lookup_local(id), LOCAL_DATA_TTL),
            ResolvedSource::Api => (self.lookup_remote(id).await, REMOTE_DATA_TTL),
        };

        let source_label = match self.source {
            ResolvedSource::Local => "local",
            ResolvedSource::Api => "api",
        };
        metrics::record_lookup(source_label, response.has_data());

        if response.has_data() {
            self.cache.set(&key, response.clone(), Some(ttl));
        }
        response
    }

    fn lookup_local(&self, id: &str) -> DataResponse {
        let timestamp = Utc::now().to_rfc3339();

        let exact = self.demo.iter().find(|(key, _)| *key == id);
        let found = exact.or_else(|| {
            if id.is_empty() {
                return None;
            }
            let needle = id.to_lowercase();
            self.demo
                .iter()
                .find(|(key, _)| key.to_lowercase().contains(&needle))
        });

        match found {
            Some((actual, data)) => {
                let mut response = DataResponse::found(DataOrigin::Local, data.clone(), timestamp);
                if *actual != id {
                    info!(requested = id, corrected = *actual, "Corrected id");
                    response.corrected_id = Some((*actual).to_string());
                }
                response
            }
            None => DataResponse::failure(
                DataOrigin::Local,
                format!("ID \"{}\" not found in local data", id),
                timestamp,
            ),
        }
    }

    async fn lookup_remote(&self, id: &str) -> DataResponse {
        match self.client.search(id).await {
            Ok(api) => {
                if api.data.is_null() {
                    return DataResponse {
                        data: None,
                        error: None,
                        source: DataOrigin::Api,
                        timestamp: api.timestamp,
                        cached: api.source == ResponseSource::Cache,
                        corrected_id: None,
                        linked_ids: None,
                    };
                }

                let corrected = ["correctedId", "corrected_id"]
                    .iter()
                    .find_map(|field| api.data.get(*field).and_then(Value::as_str))
                    .filter(|corrected| !corrected.is_empty() && *corrected != id)
                    .map(str::to_string);

                let mut response = DataResponse::found(DataOrigin::Api, api.data, api.timestamp);
                response.cached = api.source == ResponseSource::Cache;
                response.corrected_id = corrected;
                response
            }
            Err(e) => {
                warn!(id, error = %e, "Remote lookup failed");
                DataResponse::failure(DataOrigin::Api, e.to_string(), Utc::now().to_rfc3339())
            }
        }
    }

    /// Whether `id` can be looked up: table membership locally, a known id
    /// prefix against the backend.
    #[must_use]
    pub fn is_valid_id(&self, id: &str) -> bool {
        match self.source {
            ResolvedSource::Local => self.demo.iter().any(|(key, _)| *key == id),
            ResolvedSource::Api => [MEDIKAMENT_PREFIX, HERSTELLER_PREFIX, UNIT_PREFIX]
                .iter()
                .any(|prefix| id.len() > prefix.len() && id.starts_with(prefix)),
        }
    }

    /// Ids of the built-in demo table, in lookup order.
    #[must_use]
    pub fn available_ids(&self) -> Vec<String> {
        self.demo.iter().map(|(key, _)| (*key).to_string()).collect()
    }

    /// Put a response into the data cache under `id`.
    pub fn store(&self, id: &str, response: &DataResponse, ttl: Duration) {
        self.cache.set(&data_cache_key(id), response.clone(), Some(ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCacheConfig;
    use crate::client::fake::FakeTransport;
    use crate::client::{ClientError, HttpResponse};
    use crate::config::ExplorerConfig;

    fn service(source: ResolvedSource, transport: Arc<FakeTransport>, retry_attempts: u32) -> DataService {
        let mut config = ExplorerConfig::default();
        config.data.retry_attempts = retry_attempts;
        let client = Arc::new(ApiClient::new(transport, Arc::new(config)));
        let cache = Arc::new(TtlCache::in_memory(TtlCacheConfig::data()));
        DataService::new(client, source, cache)
    }

    fn unused() -> Arc<FakeTransport> {
        FakeTransport::new(|_, _| Err(ClientError::Transport("unused".into())))
    }

    #[tokio::test]
    async fn test_local_exact_then_cache() {
        let data = service(ResolvedSource::Local, unused(), 1);

        let first = data.get_data_by_id("MED-1").await;
        assert_eq!(first.source, DataOrigin::Local);
        assert!(!first.cached);
        assert_eq!(first.corrected_id, None);
        assert_eq!(first.data.as_ref().unwrap()["identifikation"]["name"], "Aspirin 500mg");
        let links = first.linked_ids.as_ref().unwrap();
        assert_eq!(links.hersteller.as_deref(), Some("HERSTELLER-1"));

        let second = data.get_data_by_id("MED-1").await;
        assert_eq!(second.source, DataOrigin::Cache);
        assert!(second.cached);
        assert_eq!(second.data, first.data);
    }

    #[tokio::test]
    async fn test_local_fuzzy_correction() {
        let data = service(ResolvedSource::Local, unused(), 1);

        let response = data.get_data_by_id("med-1").await;
        assert_eq!(response.corrected_id.as_deref(), Some("MED-1"));
        assert_eq!(response.resolved_id("med-1"), "MED-1");
        assert!(response.error.is_none());

        // First match in table order
        let response = data.get_data_by_id("-1").await;
        assert_eq!(response.corrected_id.as_deref(), Some("MED-1"));

        let response = data.get_data_by_id("unit").await;
        assert_eq!(response.corrected_id.as_deref(), Some("UNIT-1"));
    }

    #[tokio::test]
    async fn test_local_miss() {
        let data = service(ResolvedSource::Local, unused(), 1);

        let response = data.get_data_by_id("XYZ-404").await;
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("ID \"XYZ-404\" not found in local data"));
        assert!(!data.is_cached("XYZ-404"));

        assert!(data.get_data_by_id("").await.error.is_some());
    }

    #[tokio::test]
    async fn test_remote_found_with_correction() {
        let transport = FakeTransport::new(|_, _| {
            Ok(HttpResponse::ok_json(
                r#"{"correctedId":"UNIT-7","unit_id":"UNIT-7","hersteller":"HERSTELLER-2"}"#,
            ))
        });
        let data = service(ResolvedSource::Api, transport.clone(), 1);

        let response = data.get_data_by_id("unit-7").await;
        assert_eq!(response.source, DataOrigin::Api);
        assert_eq!(response.corrected_id.as_deref(), Some("UNIT-7"));
        assert_eq!(response.linked_ids.unwrap().unit, vec!["UNIT-7"]);
        assert!(data.is_cached("unit-7"));

        assert_eq!(data.get_data_by_id("unit-7").await.source, DataOrigin::Cache);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_remote_same_corrected_id_ignored() {
        let transport = FakeTransport::new(|_, _| {
            Ok(HttpResponse::ok_json(r#"{"corrected_id":"MED-9"}"#))
        });
        let data = service(ResolvedSource::Api, transport, 1);
        assert_eq!(data.get_data_by_id("MED-9").await.corrected_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_is_structured() {
        let transport = FakeTransport::new(|_, _| Err(ClientError::Transport("connection refused".into())));
        let data = service(ResolvedSource::Api, transport.clone(), 3);

        let response = data.get_data_by_id("MED-1").await;
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("connection refused"));
        assert_eq!(response.source, DataOrigin::Api);
        assert_eq!(transport.calls(), 3);
        assert!(!data.is_cached("MED-1"));
    }

    #[test]
    fn test_is_valid_id() {
        let local = service(ResolvedSource::Local, unused(), 1);
        assert!(local.is_valid_id("UNIT-1"));
        assert!(!local.is_valid_id("UNIT-2"));

        let remote = service(ResolvedSource::Api, unused(), 1);
        assert!(remote.is_valid_id("UNIT-2"));
        assert!(remote.is_valid_id("HERSTELLER-x"));
        assert!(!remote.is_valid_id("MED-"));
        assert!(!remote.is_valid_id("med-1"));
    }

    #[test]
    fn test_store_and_available_ids() {
        let data = service(ResolvedSource::Local, unused(), 1);
        assert_eq!(data.available_ids(), vec!["MED-1", "HERSTELLER-1", "UNIT-1"]);

        let response = DataResponse::found(DataOrigin::Local, serde_json::json!({"a": 1}), "t".into());
        data.store("X-1", &response, LOCAL_DATA_TTL);
        assert!(data.is_cached("X-1"));
        assert_eq!(data.cache().keys(), vec!["data_X-1"]);
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let mut response = DataResponse::found(DataOrigin::Api, serde_json::json!({"id": "MED-1"}), "t".into());
        response.corrected_id = Some("MED-1".into());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["correctedId"], "MED-1");
        assert_eq!(json["linkedIds"]["medikament"], "MED-1");
        assert_eq!(json["source"], "api");
    }
}
