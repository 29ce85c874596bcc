// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MEDIKAMENT_PREFIX: &str = "MED-";
pub const HERSTELLER_PREFIX: &str = "HERSTELLER-";
pub const UNIT_PREFIX: &str = "UNIT-";

/// Ids of related entities found inside a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medikament: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hersteller: Option<String>,
    /// Distinct unit ids in first-seen order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unit: Vec<String>,
}

impl LinkedIds {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.medikament.is_none() && self.hersteller.is_none() && self.unit.is_empty()
    }

    /// Ids worth warming next: medikament, hersteller, then up to `max_units` units.
    #[must_use]
    pub fn preload_candidates(&self, max_units: usize) -> Vec<String> {
        self.medikament
            .iter()
            .chain(self.hersteller.iter())
            .chain(self.unit.iter().take(max_units))
            .cloned()
            .collect()
    }

    fn classify(&mut self, s: &str) {
        if s.starts_with(MEDIKAMENT_PREFIX) {
            if self.medikament.is_none() {
                self.medikament = Some(s.to_string());
            }
        } else if s.starts_with(HERSTELLER_PREFIX) {
            if self.hersteller.is_none() {
                self.hersteller = Some(s.to_string());
            }
        } else if s.starts_with(UNIT_PREFIX) && !self.unit.iter().any(|u| u == s) {
            self.unit.push(s.to_string());
        }
    }
}

/// Collect linked ids from every string leaf, depth-first.
///
/// Prefixes are case-sensitive. The first medikament and hersteller win;
/// units accumulate without duplicates.
#[must_use]
pub fn extract_linked_ids(document: &Value) -> LinkedIds {
    let mut linked = LinkedIds::default();
    collect(document, &mut linked);
    linked
}

fn collect(node: &Value, linked: &mut LinkedIds) {
    match node {
        Value::String(s) => linked.classify(s),
        Value::Array(items) => items.iter().for_each(|item| collect(item, linked)),
        Value::Object(map) => map.values().for_each(|value| collect(value, linked)),
        _ => {}
    }
}

/// Whether `text` looks like a navigable product id (prefix plus at least one
/// character, case-insensitive).
#[must_use]
pub fn is_product_id(text: &str) -> bool {
    let upper = text.to_uppercase();
    [MEDIKAMENT_PREFIX, HERSTELLER_PREFIX, UNIT_PREFIX]
        .iter()
        .any(|prefix| upper.len() > prefix.len() && upper.starts_with(prefix))
}
