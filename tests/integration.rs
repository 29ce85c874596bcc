//! Integration tests for the explorer data layer.
//!
//! Everything runs in-process: the backend is a scripted [`HttpTransport`]
//! and durable storage is either in memory or a temp directory.
//!
//! # Running Tests
//! ```bash
//! cargo test --test integration
//!
//! # Only failure scenarios
//! cargo test --test integration failure
//! ```
//!
//! # Test Organization
//! - `happy_*` - Normal operation: lookups, passports, preloading, persistence
//! - `failure_*` - Backend failures surface as structured errors, never panics

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use pharmalink_explorer::client::{ClientError, HttpRequest, HttpResponse, HttpTransport};
use pharmalink_explorer::config::{DataSource, Environment};
use pharmalink_explorer::data::{DataOrigin, VersionStatus};
use pharmalink_explorer::extract::{extract_delivery_chains, DeliveryStatus};
use pharmalink_explorer::{Explorer, ExplorerConfig, FileStorage, InMemoryStorage, ResolvedSource};

// =============================================================================
// Helpers
// =============================================================================

type Handler = dyn Fn(&HttpRequest) -> Result<HttpResponse, ClientError> + Send + Sync;

/// Backend stand-in that records every requested URL.
struct ScriptedBackend {
    handler: Box<Handler>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn offline() -> Arc<Self> {
        Self::new(|_| Err(ClientError::Transport("backend offline".into())))
    }

    fn calls(&self) -> usize {
        self.urls.lock().len()
    }

    fn calls_matching(&self, needle: &str) -> usize {
        self.urls.lock().iter().filter(|u| u.contains(needle)).count()
    }
}

#[async_trait]
impl HttpTransport for ScriptedBackend {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        self.urls.lock().push(request.url.to_string());
        (self.handler)(request)
    }
}

fn query_param(request: &HttpRequest, name: &str) -> String {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

fn api_config() -> ExplorerConfig {
    let mut config = ExplorerConfig::default();
    config.app.environment = Environment::Production;
    config.data.source = DataSource::Api;
    config.data.retry_attempts = 3;
    config.data.timeout = 1_000;
    config
}

fn local_explorer() -> Explorer {
    Explorer::new(
        ExplorerConfig::default(),
        Arc::new(InMemoryStorage::new()),
        ScriptedBackend::offline(),
    )
}

// =============================================================================
// Happy Path Tests
// =============================================================================

#[tokio::test]
async fn happy_lowercase_id_is_corrected() {
    let explorer = local_explorer();
    assert_eq!(explorer.data().source(), ResolvedSource::Local);

    let response = explorer.data().get_data_by_id("med-1").await;
    assert_eq!(response.corrected_id.as_deref(), Some("MED-1"));
    assert_eq!(response.source, DataOrigin::Local);
    assert!(response.error.is_none());

    let linked = response.linked_ids.expect("linked ids attached");
    assert_eq!(linked.hersteller.as_deref(), Some("HERSTELLER-1"));
    assert_eq!(linked.unit, vec!["UNIT-1"]);
}

#[tokio::test]
async fn happy_passport_for_unit() {
    let explorer = local_explorer();

    let passport = explorer.open("UNIT-1").await;
    assert_eq!(passport.id, "UNIT-1");
    assert_eq!(passport.popups.len(), 1);

    let chain = &passport.chains[0];
    assert_eq!(chain.id, "transport");
    assert_eq!(chain.title, "Transport-Lieferkette");
    let recipients: Vec<&str> = chain.entries.iter().map(|e| e.recipient.as_str()).collect();
    assert_eq!(recipients, vec!["Endkunde", "Zustellfahrzeug", "Hub Berlin", "Versandzentrum"]);

    assert_eq!(explorer.delivery_status(&chain.entries[0].timestamp), DeliveryStatus::Delivered);
    assert_eq!(explorer.delivery_status("2999-01-01T00:00:00Z"), DeliveryStatus::Pending);
}

#[test]
fn happy_delivery_chain_newest_first() {
    let document = json!({
        "_meta_lieferkette_x": {
            "title": "T",
            "Alice": "2024-01-01T00:00:00Z",
            "Bob": "2024-01-02T00:00:00Z"
        }
    });
    let chains = extract_delivery_chains(&document);
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].entries[0].recipient, "Bob");
    assert_eq!(chains[0].total_deliveries, 2);
}

#[tokio::test]
async fn happy_remote_lookup_history_and_version() {
    let backend = ScriptedBackend::new(|request| match request.url.path() {
        "/api/v1/search" => {
            let id = query_param(request, "q");
            Ok(HttpResponse::ok_json(
                json!({"id": id, "hersteller_referenz": "HERSTELLER-3"}).to_string(),
            ))
        }
        "/api/v1/history" => Ok(HttpResponse::ok_json(
            json!({
                "key": query_param(request, "key"),
                "current_value": "B",
                "total_changes": 2,
                "history": [
                    {"value": "B", "timestamp": "2024-02-01T00:00:00Z", "user": "QA"},
                    {"value": "A", "timestamp": "2024-01-01T00:00:00Z"}
                ]
            })
            .to_string(),
        )),
        "/api/version" => Ok(HttpResponse::ok_json(r#"{"version":"2.3.1"}"#)),
        other => Ok(HttpResponse {
            status: 404,
            reason: format!("Not Found: {}", other),
            content_type: None,
            body: String::new(),
        }),
    });
    let explorer = Explorer::new(api_config(), Arc::new(InMemoryStorage::new()), backend.clone());

    let passport = explorer.open("UNIT-3").await;
    assert_eq!(passport.response.source, DataOrigin::Api);
    assert_eq!(passport.response.data.as_ref().unwrap()["id"], "UNIT-3");

    let history = explorer.key_history("UNIT-3", "status.code").await;
    assert_eq!(history.key, "status.code");
    assert_eq!(history.total_changes, 2);
    assert_eq!(history.history[0].user.as_deref(), Some("QA"));

    let version = explorer.backend_version().await;
    assert_eq!(version.version, "2.3.1");
    assert_eq!(version.status, VersionStatus::Success);

    // Second open is served by the data cache
    let again = explorer.open("UNIT-3").await;
    assert_eq!(again.response.source, DataOrigin::Cache);
    assert_eq!(backend.calls_matching("q=UNIT-3"), 1);
}

#[tokio::test(start_paused = true)]
async fn happy_preload_queue_deduplicates() {
    let backend = ScriptedBackend::new(|request| {
        Ok(HttpResponse::ok_json(json!({"id": query_param(request, "q")}).to_string()))
    });
    let explorer = Explorer::new(api_config(), Arc::new(InMemoryStorage::new()), backend.clone());

    assert!(explorer.preloader().queue_preload("UNIT-9"));
    assert!(explorer.preloader().queue_preload("UNIT-9"));
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(backend.calls_matching("q=UNIT-9"), 1);
    assert!(explorer.data().is_cached("UNIT-9"));

    // Warm now: opening it costs nothing
    explorer.open("UNIT-9").await;
    assert_eq!(backend.calls_matching("q=UNIT-9"), 1);
}

#[tokio::test]
async fn happy_link_hints_resolve_ids() {
    let explorer = local_explorer();
    assert_eq!(explorer.hint_link(Some("/HERSTELLER-1"), None), Some("HERSTELLER-1".to_string()));
    assert_eq!(explorer.hint_link(Some("/"), None), None);
    explorer.shutdown();
}

#[tokio::test]
async fn happy_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = ExplorerConfig::default();
    config.features.search_history = true;

    {
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let explorer = Explorer::new(config.clone(), storage, ScriptedBackend::offline());
        let passport = explorer.open("MED-1").await;
        explorer.dismiss_popup(&passport.popups[0].id);
        let document = passport.response.data.unwrap();
        explorer.search(&document, "hauptwirkstoff:acetyl");
    }

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let explorer = Explorer::new(config, storage, ScriptedBackend::offline());

    assert!(explorer.data().is_cached("MED-1"));
    let passport = explorer.open("MED-1").await;
    assert_eq!(passport.response.source, DataOrigin::Cache);
    assert_eq!(passport.popups.len(), 2);

    let recent = explorer.suggestions("", 5);
    assert_eq!(recent[0].query, "hauptwirkstoff:acetyl");
    assert_eq!(explorer.search_history().popular_keys(), vec!["hauptwirkstoff"]);
}

#[tokio::test(start_paused = true)]
async fn happy_lifecycle_with_idle_preload() {
    let explorer = local_explorer();
    explorer.start();

    tokio::time::sleep(Duration::from_secs(3)).await;
    let stats = explorer.preload_stats();
    assert_eq!(stats.preloaded_count, 3);
    assert!(!stats.is_preloading);

    explorer.shutdown();
    assert_eq!(explorer.state(), pharmalink_explorer::ExplorerState::Stopped);
}

// =============================================================================
// Failure Scenario Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn failure_remote_retries_exhausted() {
    let backend = ScriptedBackend::offline();
    let explorer = Explorer::new(api_config(), Arc::new(InMemoryStorage::new()), backend.clone());

    let started = tokio::time::Instant::now();
    let passport = explorer.open("MED-1").await;

    assert!(passport.response.data.is_none());
    assert_eq!(passport.response.error.as_deref(), Some("backend offline"));
    assert_eq!(backend.calls(), 3);
    // Waits of 2 s and 4 s between the three attempts
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert!(!explorer.data().is_cached("MED-1"));
}

#[tokio::test(start_paused = true)]
async fn failure_http_status_message() {
    let backend = ScriptedBackend::new(|_| {
        Ok(HttpResponse {
            status: 500,
            reason: "Internal Server Error".into(),
            content_type: None,
            body: String::new(),
        })
    });
    let explorer = Explorer::new(api_config(), Arc::new(InMemoryStorage::new()), backend);

    let response = explorer.data().get_data_by_id("UNIT-1").await;
    assert_eq!(response.error.as_deref(), Some("HTTP 500: Internal Server Error"));

    let history = explorer.key_history("UNIT-1", "a.b").await;
    assert_eq!(history.current_value, "Unbekannt");

    let version = explorer.backend_version().await;
    assert_eq!(version.version, "unknown");
}

#[tokio::test]
async fn failure_local_miss_is_structured() {
    let explorer = local_explorer();
    let response = explorer.data().get_data_by_id("UNIT-404").await;
    assert!(response.data.is_none());
    assert_eq!(response.error.as_deref(), Some("ID \"UNIT-404\" not found in local data"));
}
