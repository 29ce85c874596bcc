// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use tracing::debug;

use super::ClientError;

/// A GET request. Headers are part of the request-cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: Url,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// JSON GET with the default `Accept`/`Content-Type` headers.
    #[must_use]
    pub fn json(url: Url) -> Self {
        Self {
            url,
            headers: vec![
                ("Content-Type".into(), "application/json".into()),
                ("Accept".into(), "application/json".into()),
            ],
        }
    }

    /// Exact request identity: URL plus headers.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let headers: Vec<String> = self.headers.iter().map(|(n, v)| format!("{}={}", n, v)).collect();
        format!("{}:{}", self.url, headers.join("&"))
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl HttpResponse {
    /// 200 response with a JSON body.
    #[must_use]
    pub fn ok_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            reason: "OK".into(),
            content_type: Some("application/json".into()),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

/// Sends HTTP requests. The seam between the data layer and the network.
///
/// Implementations must not apply their own retry; timeouts are applied by
/// the caller around `send`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Production transport backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pharmalink-explorer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let mut builder = self.client.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "HTTP response");

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_request_headers() {
        let url = Url::parse("http://localhost/api").unwrap();
        let request = HttpRequest::json(url).with_header("accept", "text/plain");
        assert_eq!(request.headers.len(), 2);
        assert!(request.headers.contains(&("accept".to_string(), "text/plain".to_string())));
    }

    #[test]
    fn test_response_helpers() {
        let ok = HttpResponse::ok_json("{}");
        assert!(ok.is_success());
        assert!(ok.is_json());

        let text = HttpResponse {
            status: 500,
            reason: "Internal Server Error".into(),
            content_type: Some("text/plain; charset=utf-8".into()),
            body: "boom".into(),
        };
        assert!(!text.is_success());
        assert!(!text.is_json());
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
