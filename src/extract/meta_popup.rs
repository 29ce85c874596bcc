// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! `_meta_popup_*` annotations and their dismissal state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error};

use crate::storage::{load_json, save_json, KeyValueStorage, DISMISSED_POPUPS_KEY};

pub const POPUP_PREFIX: &str = "_meta_popup_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupKind {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl PopupKind {
    /// Unknown or missing kinds fall back to `Info`.
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("warning") => Self::Warning,
            Some("error") => Self::Error,
            Some("success") => Self::Success,
            _ => Self::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaPopup {
    pub id: String,
    pub author: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: PopupKind,
    pub dismissible: bool,
    pub priority: i64,
}

impl MetaPopup {
    fn from_sentinel(id: &str, value: &Value) -> Option<Self> {
        let popup = match value {
            Value::String(message) => Self {
                id: id.to_string(),
                author: id.to_string(),
                message: message.clone(),
                kind: PopupKind::Info,
                dismissible: true,
                priority: 0,
            },
            Value::Object(fields) => Self::from_fields(id, fields),
            _ => return None,
        };
        (!popup.message.trim().is_empty()).then_some(popup)
    }

    fn from_fields(id: &str, fields: &Map<String, Value>) -> Self {
        let text = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        };

        let priority = fields.get("priority").and_then(|p| {
            p.as_i64().or_else(|| p.as_f64().map(|f| f as i64))
        });

        Self {
            id: id.to_string(),
            author: text("author").or_else(|| text("title")).unwrap_or("System").to_string(),
            message: text("message").or_else(|| text("value")).unwrap_or_default().to_string(),
            kind: PopupKind::parse(text("type")),
            dismissible: fields.get("dismissible").and_then(Value::as_bool) != Some(false),
            priority: priority.unwrap_or(0),
        }
    }
}

/// Collect popups depth-first, highest priority first.
///
/// Ties keep document order. Sentinel values are not searched for nested
/// sentinels.
#[must_use]
pub fn extract_meta_popups(document: &Value) -> Vec<MetaPopup> {
    let mut popups = Vec::new();
    collect(document, &mut popups);
    // sort_by is stable
    popups.sort_by(|a, b| b.priority.cmp(&a.priority));
    popups
}

fn collect(node: &Value, popups: &mut Vec<MetaPopup>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                if let Some(id) = key.strip_prefix(POPUP_PREFIX) {
                    popups.extend(MetaPopup::from_sentinel(id, value));
                } else if value.is_object() || value.is_array() {
                    collect(value, popups);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect(item, popups)),
        _ => {}
    }
}

/// Dismissed popup ids, kept in durable storage.
///
/// Storage failures are logged and treated as "nothing dismissed".
pub struct DismissedPopups {
    storage: Arc<dyn KeyValueStorage>,
}

impl DismissedPopups {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    #[must_use]
    pub fn dismissed(&self) -> Vec<String> {
        match load_json(self.storage.as_ref(), DISMISSED_POPUPS_KEY) {
            Ok(ids) => ids.unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "Unreadable dismissed popup list");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn is_dismissed(&self, id: &str) -> bool {
        self.dismissed().iter().any(|d| d == id)
    }

    pub fn dismiss(&self, id: &str) {
        let mut ids = self.dismissed();
        if ids.iter().any(|d| d == id) {
            return;
        }
        ids.push(id.to_string());
        if let Err(e) = save_json(self.storage.as_ref(), DISMISSED_POPUPS_KEY, &ids) {
            error!(popup = %id, error = %e, "Failed to dismiss popup");
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(DISMISSED_POPUPS_KEY) {
            error!(error = %e, "Failed to clear dismissed popups");
        }
    }

    /// Popups that have not been dismissed, order preserved.
    #[must_use]
    pub fn visible(&self, popups: Vec<MetaPopup>) -> Vec<MetaPopup> {
        let dismissed = self.dismissed();
        popups
            .into_iter()
            .filter(|p| !dismissed.iter().any(|d| *d == p.id))
            .collect()
    }
}
