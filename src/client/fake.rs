// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Scriptable transport for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::{ClientError, HttpRequest, HttpResponse, HttpTransport};

type Handler = dyn Fn(&HttpRequest, usize) -> Result<HttpResponse, ClientError> + Send + Sync;

/// Answers every request through `handler(request, call_number)` (1-based).
pub(crate) struct FakeTransport {
    handler: Box<Handler>,
    delay: Duration,
    urls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest, usize) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
    {
        Self::with_delay(Duration::ZERO, handler)
    }

    pub(crate) fn with_delay<F>(delay: Duration, handler: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest, usize) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            delay,
            urls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.urls.lock().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
        let call = {
            let mut urls = self.urls.lock();
            urls.push(request.url.to_string());
            urls.len()
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.handler)(request, call)
    }
}
