// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Backend HTTP access.
//!
//! ```text
//! ApiClient ──→ request cache (TtlCache, URL + options)
//!     │
//!     └─→ retry(timeout(HttpTransport::send)) ──→ ReqwestTransport | test fakes
//! ```

mod api_client;
mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use api_client::{ApiClient, ApiResponse, RequestCacheStats, ResponseSource};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the API client. `Display` is the message shown to users.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Configuration not available")]
    ConfigUnavailable,
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },
    #[error("Request timed out after {} ms", .0.as_millis())]
    Timeout(Duration),
    #[error("{0}")]
    Transport(String),
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigUnavailable => "config",
            Self::Http { .. } => "http",
            Self::Timeout(_) => "timeout",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::InvalidUrl(_) => "url",
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(ClientError::ConfigUnavailable.to_string(), "Configuration not available");
        assert_eq!(
            ClientError::Http { status: 503, reason: "Service Unavailable".into() }.to_string(),
            "HTTP 503: Service Unavailable"
        );
        assert_eq!(
            ClientError::Timeout(Duration::from_millis(1500)).to_string(),
            "Request timed out after 1500 ms"
        );
    }

    #[test]
    fn test_status_and_kind() {
        let http = ClientError::Http { status: 404, reason: "Not Found".into() };
        assert_eq!(http.status(), Some(404));
        assert_eq!(http.kind(), "http");
        assert_eq!(ClientError::Transport("reset".into()).status(), None);
    }
}
