// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backend API client.
//!
//! # Request Flow
//!
//! 1. Resolve the configuration (given up front, or fetched once from the
//!    config endpoint). No configuration → [`ClientError::ConfigUnavailable`].
//! 2. Serve from the request cache if the same URL + headers were fetched
//!    within `data.cache_duration`.
//! 3. Otherwise try up to `data.retry_attempts` times, each attempt bounded by
//!    `data.timeout`, waiting `2^n` seconds after failed attempt `n`.

use chrono::Utc;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::transport::{HttpRequest, HttpTransport};
use super::ClientError;
use crate::cache::{TtlCache, TtlCacheConfig};
use crate::config::{ApiConfig, ExplorerConfig};
use crate::metrics::{self, LatencyTimer};
use crate::resilience::{retry, RetryConfig};

/// Timeout for the one-off configuration fetch.
const CONFIG_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Api,
    Cache,
}

/// A successful JSON response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub data: Value,
    pub source: ResponseSource,
    /// RFC 3339 time the payload was fetched from the backend
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedBody {
    data: Value,
    fetched_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestCacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    config: OnceCell<Arc<ExplorerConfig>>,
    config_url: Option<Url>,
    cache: TtlCache<CachedBody>,
}

impl ApiClient {
    /// Client with a known configuration.
    pub fn new(transport: Arc<dyn HttpTransport>, config: Arc<ExplorerConfig>) -> Self {
        let ttl = config.data.cache_duration();
        Self {
            transport,
            config: OnceCell::new_with(Some(config)),
            config_url: None,
            cache: TtlCache::in_memory(TtlCacheConfig::request(ttl)),
        }
    }

    /// Client that fetches its configuration from `config_url` on first use.
    ///
    /// A failed fetch is retried by the next request.
    pub fn with_remote_config(transport: Arc<dyn HttpTransport>, config_url: Url) -> Self {
        Self {
            transport,
            config: OnceCell::new(),
            config_url: Some(config_url),
            cache: TtlCache::in_memory(TtlCacheConfig::request(ExplorerConfig::default().data.cache_duration())),
        }
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<dyn HttpTransport> {
        &self.transport
    }

    /// The active configuration, loading it on first use.
    pub async fn config(&self) -> Result<Arc<ExplorerConfig>, ClientError> {
        self.config
            .get_or_try_init(|| self.load_config())
            .await
            .map(Arc::clone)
    }

    async fn load_config(&self) -> Result<Arc<ExplorerConfig>, ClientError> {
        let Some(url) = &self.config_url else {
            return Err(ClientError::ConfigUnavailable);
        };

        let request = HttpRequest::json(url.clone());
        let response = match tokio::time::timeout(CONFIG_FETCH_TIMEOUT, self.transport.send(&request)).await {
            Ok(Ok(response)) if response.is_success() => response,
            Ok(Ok(response)) => {
                warn!(url = %url, status = response.status, "Config endpoint returned an error");
                return Err(ClientError::ConfigUnavailable);
            }
            Ok(Err(e)) => {
                warn!(url = %url, error = %e, "Config fetch failed");
                return Err(ClientError::ConfigUnavailable);
            }
            Err(_) => {
                warn!(url = %url, "Config fetch timed out");
                return Err(ClientError::ConfigUnavailable);
            }
        };

        match serde_json::from_str::<ExplorerConfig>(&response.body) {
            Ok(config) => {
                debug!(url = %url, "Remote config loaded");
                Ok(Arc::new(config))
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Config payload is not valid");
                Err(ClientError::ConfigUnavailable)
            }
        }
    }

    /// Resolve an endpoint path against `api.origin` and append query parameters.
    pub fn resolve_url(api: &ApiConfig, path: &str, params: &[(&str, &str)]) -> Result<Url, ClientError> {
        let mut url = match Url::parse(path) {
            Ok(url) => url,
            Err(_) => Url::parse(&api.origin)
                .and_then(|origin| origin.join(path))
                .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", path, e)))?,
        };
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Look up an id or free-text query via the search endpoint.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<ApiResponse, ClientError> {
        let config = self.config().await?;
        let url = Self::resolve_url(&config.api, &config.api.search_url, &[("q", query)])?;
        self.get_json("search", HttpRequest::json(url)).await
    }

    /// Change history of one field of a product.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, id: &str, key_path: &str) -> Result<ApiResponse, ClientError> {
        let config = self.config().await?;
        let url = Self::resolve_url(
            &config.api,
            &config.api.history_url,
            &[("id", id), ("key", key_path)],
        )?;
        self.get_json("history", HttpRequest::json(url)).await
    }

    /// Cached, retried JSON GET.
    pub async fn get_json(
        &self,
        endpoint: &'static str,
        request: HttpRequest,
    ) -> Result<ApiResponse, ClientError> {
        let config = self.config().await?;
        let key = request.cache_key();

        if let Some(cached) = self.cache.get(&key) {
            metrics::record_request(endpoint, "cache");
            return Ok(ApiResponse {
                data: cached.data,
                source: ResponseSource::Cache,
                timestamp: cached.fetched_at,
            });
        }

        let retry_config = RetryConfig::api(config.data.retry_attempts);
        let per_attempt = config.data.timeout();
        let _timer = LatencyTimer::new(endpoint);

        match retry(endpoint, &retry_config, || self.attempt(&request, per_attempt)).await {
            Ok(data) => {
                let fetched_at = Utc::now().to_rfc3339();
                self.cache.set(
                    &key,
                    CachedBody {
                        data: data.clone(),
                        fetched_at: fetched_at.clone(),
                    },
                    Some(config.data.cache_duration()),
                );
                metrics::record_request(endpoint, "success");
                Ok(ApiResponse {
                    data,
                    source: ResponseSource::Api,
                    timestamp: fetched_at,
                })
            }
            Err(e) => {
                metrics::record_request(endpoint, e.kind());
                Err(e)
            }
        }
    }

    async fn attempt(&self, request: &HttpRequest, per_attempt: Duration) -> Result<Value, ClientError> {
        let response = tokio::time::timeout(per_attempt, self.transport.send(request))
            .await
            .map_err(|_| ClientError::Timeout(per_attempt))??;

        if !response.is_success() {
            return Err(ClientError::Http {
                status: response.status,
                reason: response.reason,
            });
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn cache_stats(&self) -> RequestCacheStats {
        RequestCacheStats {
            size: self.cache.len(),
            keys: self.cache.keys(),
        }
    }
}
