// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backend version probe.
//!
//! A successful answer is reused for [`VERSION_CACHE_TTL`]. A failure with no
//! earlier success is remembered as `unknown` for [`VERSION_ERROR_RETRY`];
//! a failure after a success keeps serving the last good version.

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ApiClient, ClientError, HttpRequest};

pub const VERSION_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const VERSION_ERROR_RETRY: Duration = Duration::from_secs(30);
pub const VERSION_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendVersion {
    pub version: String,
    pub timestamp: String,
    pub status: VersionStatus,
}

impl BackendVersion {
    fn success(version: String) -> Self {
        Self {
            version,
            timestamp: Utc::now().to_rfc3339(),
            status: VersionStatus::Success,
        }
    }

    fn unknown() -> Self {
        Self {
            version: "unknown".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            status: VersionStatus::Error,
        }
    }
}

#[derive(Default)]
struct VersionState {
    cached: Option<(BackendVersion, Instant)>,
}

pub struct VersionService {
    client: Arc<ApiClient>,
    state: Mutex<VersionState>,
}

impl VersionService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Mutex::new(VersionState::default()),
        }
    }

    /// Current backend version. Never fails; see the module docs for caching.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_backend_version(&self) -> BackendVersion {
        let now = Instant::now();
        let cached = self.state.lock().cached.clone();
        if let Some((version, valid_until)) = cached {
            if now < valid_until {
                return version;
            }
        }

        match self.fetch().await {
            Ok(version) => {
                debug!(version = %version, "Backend version fetched");
                let version = BackendVersion::success(version);
                self.state.lock().cached = Some((version.clone(), now + VERSION_CACHE_TTL));
                version
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch backend version");
                let mut state = self.state.lock();
                match &state.cached {
                    Some((version, _)) if version.status == VersionStatus::Success => version.clone(),
                    _ => {
                        let version = BackendVersion::unknown();
                        state.cached = Some((version.clone(), now + VERSION_ERROR_RETRY));
                        version
                    }
                }
            }
        }
    }

    async fn fetch(&self) -> Result<String, ClientError> {
        let config = self.client.config().await?;
        let url = ApiClient::resolve_url(&config.api, &config.api.backend_version_url, &[])?;
        let request = HttpRequest {
            url,
            headers: vec![("Accept".into(), "application/json".into())],
        };

        let response = tokio::time::timeout(VERSION_FETCH_TIMEOUT, self.client.transport().send(&request))
            .await
            .map_err(|_| ClientError::Timeout(VERSION_FETCH_TIMEOUT))??;
        if !response.is_success() {
            return Err(ClientError::Http {
                status: response.status,
                reason: response.reason,
            });
        }

        let payload = if response.is_json() {
            serde_json::from_str::<Value>(&response.body).unwrap_or(Value::Null)
        } else {
            // Plain text, unless it is JSON behind the wrong content type
            serde_json::from_str::<Value>(&response.body)
                .unwrap_or_else(|_| Value::String(response.body.clone()))
        };
        parse_version(&payload)
    }
}

/// Normalize a version payload: a bare string, `{version}` or `{value}`.
pub fn parse_version(payload: &Value) -> Result<String, ClientError> {
    let field = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match payload {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Object(map) => map
            .get("version")
            .or_else(|| map.get("value"))
            .map(field)
            .ok_or_else(|| ClientError::Decode("Invalid response format for backend version".into())),
        _ => Err(ClientError::Decode("Invalid response format for backend version".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeTransport;
    use crate::client::HttpResponse;
    use crate::config::ExplorerConfig;
    use serde_json::json;

    fn service(transport: Arc<FakeTransport>) -> VersionService {
        let client = ApiClient::new(transport, Arc::new(ExplorerConfig::default()));
        VersionService::new(Arc::new(client))
    }

    fn text(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            reason: "OK".into(),
            content_type: Some("text/plain".into()),
            body: body.into(),
        }
    }

    #[test]
    fn test_parse_version_shapes() {
        assert_eq!(parse_version(&json!(" 1.4.2\n")).unwrap(), "1.4.2");
        assert_eq!(parse_version(&json!({"version": "2.0"})).unwrap(), "2.0");
        assert_eq!(parse_version(&json!({"value": "3.1"})).unwrap(), "3.1");
        assert!(parse_version(&json!([1])).is_err());
        assert!(parse_version(&json!({"build": 7})).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_cached() {
        let transport = FakeTransport::new(|_, _| Ok(text("1.0.0\n")));
        let versions = service(transport.clone());

        let first = versions.fetch_backend_version().await;
        assert_eq!(first.version, "1.0.0");
        assert_eq!(first.status, VersionStatus::Success);
        assert_eq!(
            transport.urls(),
            vec!["http://localhost:3000/api/version"]
        );

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(versions.fetch_backend_version().await, first);
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(VERSION_CACHE_TTL).await;
        versions.fetch_backend_version().await;
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_json_behind_text_content_type() {
        let transport = FakeTransport::new(|_, _| Ok(text(r#"{"version":"4.2.0"}"#)));
        assert_eq!(service(transport).fetch_backend_version().await.version, "4.2.0");
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_without_success_retries_after_30s() {
        let transport = FakeTransport::new(|_, _| Err(ClientError::Transport("refused".into())));
        let versions = service(transport.clone());

        let first = versions.fetch_backend_version().await;
        assert_eq!(first.version, "unknown");
        assert_eq!(first.status, VersionStatus::Error);

        tokio::time::advance(Duration::from_secs(10)).await;
        versions.fetch_backend_version().await;
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(Duration::from_secs(25)).await;
        versions.fetch_backend_version().await;
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_after_success_keeps_last_version() {
        let transport = FakeTransport::new(|_, call| {
            if call == 1 {
                Ok(HttpResponse::ok_json(r#"{"value":"9.9"}"#))
            } else {
                Ok(HttpResponse {
                    status: 502,
                    reason: "Bad Gateway".into(),
                    content_type: None,
                    body: String::new(),
                })
            }
        });
        let versions = service(transport.clone());

        assert_eq!(versions.fetch_backend_version().await.version, "9.9");
        tokio::time::advance(VERSION_CACHE_TTL + Duration::from_secs(1)).await;

        let stale = versions.fetch_backend_version().await;
        assert_eq!(stale.version, "9.9");
        assert_eq!(stale.status, VersionStatus::Success);
        assert_eq!(transport.calls(), 2);
    }
}
