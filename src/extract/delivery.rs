// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `_meta_lieferkette_*` delivery chains.
//!
//! A chain sentinel maps recipients to handoff timestamps:
//!
//! ```text
//! "_meta_lieferkette_produktion": {
//!     "title": "Produktions-Lieferkette",
//!     "Dr. Schmidt": "2024-07-01T14:32:00Z",
//!     "QS-Team": {"datum": "2024-07-01T15:45:00Z", "ort": "Leverkusen"}
//! }
//! ```
//!
//! The value may also be a JSON-encoded string of the same object. Anything
//! else that is a string becomes a single `System` entry.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use std::time::Duration;

pub const DELIVERY_PREFIX: &str = "_meta_lieferkette";

const RESERVED_KEYS: [&str; 2] = ["title", "description"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEntry {
    pub id: String,
    pub recipient: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryChain {
    pub id: String,
    pub title: String,
    /// Newest first
    pub entries: Vec<DeliveryEntry>,
    pub total_deliveries: usize,
}

impl DeliveryChain {
    fn new(id: &str, title: Option<&str>, mut entries: Vec<DeliveryEntry>) -> Self {
        // Stable; unparseable timestamps (None) sort last
        entries.sort_by_cached_key(|e| Reverse(parse_timestamp(&e.timestamp)));
        Self {
            id: id.to_string(),
            title: title
                .filter(|t| !t.is_empty())
                .map_or_else(|| format!("Lieferkette {}", id), str::to_string),
            total_deliveries: entries.len(),
            entries,
        }
    }
}

/// Parse the timestamp formats seen in delivery chains.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS`
/// (read as UTC) and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Collect delivery chains depth-first in document order.
#[must_use]
pub fn extract_delivery_chains(document: &Value) -> Vec<DeliveryChain> {
    let mut chains = Vec::new();
    collect(document, &mut chains);
    chains
}

fn collect(node: &Value, chains: &mut Vec<DeliveryChain>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                if let Some(suffix) = key.strip_prefix(DELIVERY_PREFIX) {
                    chains.extend(chain_from_sentinel(&chain_id(suffix), value));
                } else if value.is_object() || value.is_array() {
                    collect(value, chains);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect(item, chains)),
        _ => {}
    }
}

fn chain_id(suffix: &str) -> String {
    let id = suffix.strip_prefix('_').unwrap_or(suffix);
    if id.is_empty() {
        "default".to_string()
    } else {
        id.to_string()
    }
}

fn chain_from_sentinel(id: &str, value: &Value) -> Option<DeliveryChain> {
    match value {
        Value::Object(fields) => Some(chain_from_fields(id, fields)),
        Value::String(raw) => Some(match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(fields)) => chain_from_fields(id, &fields),
            _ => DeliveryChain::new(
                id,
                None,
                vec![DeliveryEntry {
                    id: format!("{}_info", id),
                    recipient: "System".to_string(),
                    timestamp: raw.clone(),
                    location: None,
                    status: None,
                }],
            ),
        }),
        _ => None,
    }
}

fn chain_from_fields(id: &str, fields: &Map<String, Value>) -> DeliveryChain {
    let entries = fields
        .iter()
        .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
        .filter_map(|(recipient, value)| entry_from_value(id, recipient, value))
        .collect();

    DeliveryChain::new(id, fields.get("title").and_then(Value::as_str), entries)
}

fn entry_from_value(chain: &str, recipient: &str, value: &Value) -> Option<DeliveryEntry> {
    let entry = |timestamp: String, location: Option<String>, status: Option<String>| DeliveryEntry {
        id: format!("{}_{}", chain, recipient),
        recipient: recipient.to_string(),
        timestamp,
        location,
        status,
    };

    match value {
        Value::String(timestamp) => Some(entry(timestamp.clone(), None, None)),
        Value::Object(details) => {
            let text = |name: &str| {
                details
                    .get(name)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            // Numeric stamps are kept as their decimal text; zero counts as unset
            let stamp = |name: &str| match details.get(name) {
                Some(Value::Number(n)) if n.as_f64() != Some(0.0) => Some(n.to_string()),
                _ => text(name),
            };
            Some(entry(
                stamp("timestamp").or_else(|| stamp("datum")).unwrap_or_default(),
                text("location").or_else(|| text("ort")),
                text("status"),
            ))
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryStatus {
    Pending,
    InTransit,
    Delivered,
}

/// Classifies a handoff timestamp relative to now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStatusPolicy {
    /// Handoffs younger than this are still in transit
    pub in_transit_window: Duration,
}

impl Default for DeliveryStatusPolicy {
    fn default() -> Self {
        Self {
            in_transit_window: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl DeliveryStatusPolicy {
    /// Future → pending, within the window → in transit, otherwise (or
    /// unparseable) → delivered.
    #[must_use]
    pub fn status(&self, timestamp: &str, now: DateTime<Utc>) -> DeliveryStatus {
        let Some(at) = parse_timestamp(timestamp) else {
            return DeliveryStatus::Delivered;
        };
        let age = now.signed_duration_since(at);
        if age < chrono::Duration::zero() {
            return DeliveryStatus::Pending;
        }
        match age.to_std() {
            Ok(age) if age < self.in_transit_window => DeliveryStatus::InTransit,
            _ => DeliveryStatus::Delivered,
        }
    }
}
