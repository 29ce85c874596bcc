// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-field change history.
//!
//! History is advisory: any failure degrades to an empty history with
//! `current_value = "Unbekannt"` rather than an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::demo::demo_history;
use crate::client::ApiClient;
use crate::config::ResolvedSource;

/// Placeholder shown when no history is known for a field.
pub const UNKNOWN_VALUE: &str = "Unbekannt";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub value: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub key: String,
    pub current_value: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub total_changes: usize,
}

impl HistoryResponse {
    /// Empty history for `key_path`.
    #[must_use]
    pub fn unknown(key_path: &str) -> Self {
        Self {
            key: key_path.to_string(),
            current_value: UNKNOWN_VALUE.to_string(),
            history: Vec::new(),
            total_changes: 0,
        }
    }
}

/// Dotted key path for a tree node: array indices are dropped, the key name
/// is appended.
///
/// ```
/// use pharmalink_explorer::data::build_key_identifier;
///
/// let path = ["lieferkette_historie".to_string(), "2".to_string()];
/// assert_eq!(build_key_identifier(&path, "station"), "lieferkette_historie.station");
/// ```
#[must_use]
pub fn build_key_identifier(path: &[String], key: &str) -> String {
    path.iter()
        .map(String::as_str)
        .filter(|segment| segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()))
        .chain(std::iter::once(key))
        .collect::<Vec<_>>()
        .join(".")
}

pub struct HistoryService {
    client: Arc<ApiClient>,
    source: ResolvedSource,
    demo: HashMap<&'static str, HistoryResponse>,
}

impl HistoryService {
    pub fn new(client: Arc<ApiClient>, source: ResolvedSource) -> Self {
        Self {
            client,
            source,
            demo: demo_history().into_iter().collect(),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn fetch_key_history(&self, product_id: &str, key_path: &str) -> HistoryResponse {
        match self.source {
            ResolvedSource::Local => {
                let lookup = format!("{}.{}", product_id, key_path);
                match self.demo.get(lookup.as_str()) {
                    Some(record) => record.clone(),
                    None => {
                        debug!(key = %lookup, "No demo history");
                        HistoryResponse::unknown(key_path)
                    }
                }
            }
            ResolvedSource::Api => match self.client.history(product_id, key_path).await {
                Ok(response) => match serde_json::from_value::<HistoryResponse>(response.data) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!(product_id, key_path, error = %e, "Malformed history payload");
                        HistoryResponse::unknown(key_path)
                    }
                },
                Err(e) => {
                    warn!(product_id, key_path, error = %e, "Failed to fetch history from API");
                    HistoryResponse::unknown(key_path)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeTransport;
    use crate::client::{ClientError, HttpResponse};
    use crate::config::ExplorerConfig;

    fn service(source: ResolvedSource, transport: Arc<FakeTransport>) -> HistoryService {
        let mut config = ExplorerConfig::default();
        config.data.retry_attempts = 1;
        let client = Arc::new(ApiClient::new(transport, Arc::new(config)));
        HistoryService::new(client, source)
    }

    #[test]
    fn test_build_key_identifier() {
        let path = vec!["a".to_string(), "0".to_string(), "b".to_string(), "12".to_string()];
        assert_eq!(build_key_identifier(&path, "c"), "a.b.c");
        assert_eq!(build_key_identifier(&[], "root"), "root");
        // Mixed segments are not indices
        assert_eq!(build_key_identifier(&["v2".to_string()], "x"), "v2.x");
    }

    #[tokio::test]
    async fn test_local_history_hit() {
        let transport = FakeTransport::new(|_, _| Ok(HttpResponse::ok_json("{}")));
        let history = service(ResolvedSource::Local, transport.clone());

        let record = history.fetch_key_history("MED-1", "identifikation.pzn").await;
        assert_eq!(record.total_changes, 3);
        assert_eq!(record.current_value, "08296572");
        assert_eq!(record.history[2].value, "08296570");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_local_history_miss() {
        let transport = FakeTransport::new(|_, _| Ok(HttpResponse::ok_json("{}")));
        let history = service(ResolvedSource::Local, transport);

        let record = history.fetch_key_history("MED-1", "wirkstoff.reinheit").await;
        assert_eq!(record, HistoryResponse::unknown("wirkstoff.reinheit"));
        assert_eq!(record.current_value, "Unbekannt");
    }

    #[tokio::test]
    async fn test_remote_history() {
        let transport = FakeTransport::new(|_, _| {
            Ok(HttpResponse::ok_json(
                r#"{"key":"a.b","current_value":"2","total_changes":1,
                    "history":[{"value":"2","timestamp":"2024-01-01T00:00:00Z"}]}"#,
            ))
        });
        let history = service(ResolvedSource::Api, transport);

        let record = history.fetch_key_history("UNIT-7", "a.b").await;
        assert_eq!(record.current_value, "2");
        assert_eq!(record.history[0].user, None);
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back() {
        let transport = FakeTransport::new(|_, _| Err(ClientError::Transport("refused".into())));
        let history = service(ResolvedSource::Api, transport);
        assert_eq!(
            history.fetch_key_history("MED-1", "x").await,
            HistoryResponse::unknown("x")
        );
    }

    #[tokio::test]
    async fn test_malformed_payload_falls_back() {
        let transport = FakeTransport::new(|_, _| Ok(HttpResponse::ok_json(r#"[1,2,3]"#)));
        let history = service(ResolvedSource::Api, transport);
        assert_eq!(history.fetch_key_history("MED-1", "x").await.total_changes, 0);
    }
}
