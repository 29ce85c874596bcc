// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the explorer data layer.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding program is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `pharmalink_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `cache`: global, config, data, request
//! - `endpoint`: config, search, history, version
//! - `outcome`: success, error, timeout, skipped

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a cache lookup (`result` is `hit` or `miss`)
pub fn record_cache_lookup(cache: &str, result: &str) {
    counter!(
        "pharmalink_cache_lookups_total",
        "cache" => cache.to_string(),
        "result" => result.to_string()
    )
    .increment(1);
}

/// Record entries evicted for capacity
pub fn record_cache_eviction(cache: &str, count: usize) {
    counter!(
        "pharmalink_cache_evictions_total",
        "cache" => cache.to_string()
    )
    .increment(count as u64);
}

/// Set the current entry count of a cache
pub fn set_cache_entries(cache: &str, count: usize) {
    gauge!(
        "pharmalink_cache_entries",
        "cache" => cache.to_string()
    )
    .set(count as f64);
}

/// Record a cache snapshot that could not be persisted
pub fn record_persist_failure(cache: &str) {
    counter!(
        "pharmalink_cache_persist_failures_total",
        "cache" => cache.to_string()
    )
    .increment(1);
}

/// Record a backend request outcome
pub fn record_request(endpoint: &str, outcome: &str) {
    counter!(
        "pharmalink_requests_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record backend request latency
pub fn record_request_latency(endpoint: &str, duration: Duration) {
    histogram!(
        "pharmalink_request_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a failed attempt inside a retry loop
pub fn record_retry(operation: &str) {
    counter!(
        "pharmalink_retries_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Record a `get_data_by_id` resolution (`source` is local, api or cache)
pub fn record_lookup(source: &str, found: bool) {
    counter!(
        "pharmalink_lookups_total",
        "source" => source.to_string(),
        "status" => if found { "found" } else { "error" }
    )
    .increment(1);
}

/// Record a preload outcome
pub fn record_preload(outcome: &str) {
    counter!(
        "pharmalink_preloads_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Set the number of ids waiting in the preload queue
pub fn set_preload_queue(count: usize) {
    gauge!("pharmalink_preload_queue").set(count as f64);
}

/// Record explorer lifecycle transitions
pub fn set_explorer_state(state: &str) {
    counter!(
        "pharmalink_explorer_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

/// RAII timer that records request latency when dropped
pub struct LatencyTimer {
    endpoint: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(endpoint: &'static str) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_request_latency(self.endpoint, self.start.elapsed());
    }
}
