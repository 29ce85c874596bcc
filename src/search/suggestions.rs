// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search history with ranked autocomplete.
//!
//! Past queries are kept most-recent-first (capped at 100) and persisted under
//! [`SEARCH_CACHE_KEY`]. `key:value` queries also teach a per-key value index
//! used to complete the value side of later queries.
//!
//! # Ranking
//!
//! Suggestions are ordered by category (recent, then frequent, then suggested)
//! and within a category by `0.7 * frequency + 0.3 * (last_used / 1e6)`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::json_search::parse_key_value_query;
use crate::cache::now_millis;
use crate::storage::{load_json, save_json, KeyValueStorage, SEARCH_CACHE_KEY};

/// Maximum number of remembered queries
pub const MAX_HISTORY_SIZE: usize = 100;
/// Default number of suggestions returned
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;
/// Entries older than this are dropped when history is loaded
pub const HISTORY_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryType {
    Simple,
    KeyValue,
}

impl QueryType {
    #[must_use]
    pub fn detect(query: &str) -> Self {
        if query.contains(':') {
            Self::KeyValue
        } else {
            Self::Simple
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntry {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: QueryType,
    pub timestamp: u64,
    pub result_count: usize,
    pub successful: bool,
    pub frequency: u32,
}

/// Learned values for one key, in first-seen order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePattern {
    pub key: String,
    pub values: Vec<String>,
    pub frequency: u32,
    pub last_used: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionCategory {
    Recent,
    Frequent,
    Suggested,
}

impl SuggestionCategory {
    fn priority(self) -> u8 {
        match self {
            Self::Recent => 3,
            Self::Frequent => 2,
            Self::Suggested => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSuggestion {
    pub query: String,
    #[serde(rename = "type")]
    pub kind: QueryType,
    pub frequency: u32,
    pub last_used: u64,
    pub result_count: usize,
    pub category: SuggestionCategory,
}

impl SearchSuggestion {
    fn from_entry(entry: &SearchEntry, category: SuggestionCategory) -> Self {
        Self {
            query: entry.query.clone(),
            kind: entry.kind,
            frequency: entry.frequency,
            last_used: entry.timestamp,
            result_count: entry.result_count,
            category,
        }
    }

    fn from_pattern(query: String, pattern: &KeyValuePattern) -> Self {
        Self {
            query,
            kind: QueryType::KeyValue,
            frequency: pattern.frequency,
            last_used: pattern.last_used,
            result_count: 0,
            category: SuggestionCategory::Suggested,
        }
    }

    fn score(&self) -> f64 {
        f64::from(self.frequency) * 0.7 + (self.last_used as f64 / 1_000_000.0) * 0.3
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionStats {
    pub total_entries: usize,
    /// Sum of frequencies
    pub total_searches: u64,
    pub successful_searches: usize,
    pub key_value_searches: usize,
    pub simple_searches: usize,
    pub unique_keys: usize,
    /// Percentage (0 - 100) of entries marked successful
    pub success_rate: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct History {
    #[serde(default)]
    search_history: Vec<SearchEntry>,
    #[serde(default)]
    key_value_patterns: Vec<KeyValuePattern>,
}

impl History {
    fn pattern(&self, key: &str) -> Option<&KeyValuePattern> {
        self.key_value_patterns.iter().find(|p| p.key == key)
    }

    fn learn_pattern(&mut self, query: &str, now: u64) {
        let Some((key, value)) = parse_key_value_query(query) else {
            return;
        };
        let key = key.to_lowercase();
        if key.is_empty() || value.is_empty() {
            return;
        }

        match self.key_value_patterns.iter_mut().find(|p| p.key == key) {
            Some(pattern) => {
                if !pattern.values.iter().any(|v| v == value) {
                    pattern.values.push(value.to_string());
                }
                pattern.frequency += 1;
                pattern.last_used = now;
            }
            None => self.key_value_patterns.push(KeyValuePattern {
                key,
                values: vec![value.to_string()],
                frequency: 1,
                last_used: now,
            }),
        }
    }
}

/// Persisted, ranked search history.
pub struct SearchSuggestionCache {
    storage: Option<Arc<dyn KeyValueStorage>>,
    history: Mutex<History>,
}

impl SearchSuggestionCache {
    /// Load history from `storage`, purging entries past the retention window.
    pub fn new(storage: Option<Arc<dyn KeyValueStorage>>) -> Self {
        let history = match storage.as_deref() {
            Some(storage) => Self::load(storage),
            None => History::default(),
        };
        Self {
            storage,
            history: Mutex::new(history),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Record a query, or bump it if already known (case-insensitive, same type).
    pub fn add_search(&self, query: &str, result_count: usize, successful: bool) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }

        let kind = QueryType::detect(query);
        let now = now_millis();
        let mut history = self.history.lock();

        let lowered = query.to_lowercase();
        let existing = history
            .search_history
            .iter()
            .position(|e| e.kind == kind && e.query.to_lowercase() == lowered);

        match existing {
            Some(index) => {
                let mut entry = history.search_history.remove(index);
                entry.frequency += 1;
                entry.timestamp = now;
                entry.result_count = result_count;
                entry.successful = successful;
                history.search_history.insert(0, entry);
            }
            None => {
                history.search_history.insert(
                    0,
                    SearchEntry {
                        query: query.to_string(),
                        kind,
                        timestamp: now,
                        result_count,
                        successful,
                        frequency: 1,
                    },
                );
                history.search_history.truncate(MAX_HISTORY_SIZE);
            }
        }

        if kind == QueryType::KeyValue {
            history.learn_pattern(query, now);
        }

        debug!(query = %query, result_count, successful, "Search recorded");
        self.save(&history);
    }

    /// Ranked suggestions for a partially typed query.
    ///
    /// An empty query returns [`recent_searches`](Self::recent_searches).
    #[must_use]
    pub fn suggestions(&self, query: &str, limit: usize) -> Vec<SearchSuggestion> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.recent_searches(limit);
        }

        let history = self.history.lock();
        let mut suggestions: Vec<SearchSuggestion> = history
            .search_history
            .iter()
            .filter(|e| e.query.to_lowercase().starts_with(&query))
            .take(3)
            .map(|e| SearchSuggestion::from_entry(e, SuggestionCategory::Recent))
            .collect();

        if query.contains(':') {
            suggestions.extend(Self::value_completions(&history, &query));
        } else {
            suggestions.extend(Self::key_completions(&history, &query));
        }

        let frequent: Vec<SearchSuggestion> = history
            .search_history
            .iter()
            .filter(|e| {
                e.frequency > 2
                    && e.query.to_lowercase().contains(&query)
                    && !suggestions.iter().any(|s| s.query == e.query)
            })
            .take(2)
            .map(|e| SearchSuggestion::from_entry(e, SuggestionCategory::Frequent))
            .collect();
        suggestions.extend(frequent);

        suggestions.sort_by(|a, b| {
            b.category
                .priority()
                .cmp(&a.category.priority())
                .then_with(|| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal))
        });
        suggestions.truncate(limit);
        suggestions
    }

    /// Complete the value side of `key:partial` from learned values.
    fn value_completions(history: &History, query: &str) -> Vec<SearchSuggestion> {
        let Some((key, partial)) = query.split_once(':') else {
            return Vec::new();
        };
        if key.is_empty() {
            return Vec::new();
        }
        let Some(pattern) = history.pattern(key.trim()) else {
            return Vec::new();
        };

        // `key: ba` completes like `key:ba`
        let partial = partial.trim_start();
        pattern
            .values
            .iter()
            .filter(|v| v.to_lowercase().starts_with(partial))
            .take(5)
            .map(|v| SearchSuggestion::from_pattern(format!("{}:{}", key, v), pattern))
            .collect()
    }

    /// Propose `key:<first learned value>` for learned keys with this prefix.
    fn key_completions(history: &History, query: &str) -> Vec<SearchSuggestion> {
        history
            .key_value_patterns
            .iter()
            .filter(|p| p.key.starts_with(query))
            .take(3)
            .map(|p| {
                let first = p.values.first().map(String::as_str).unwrap_or_default();
                SearchSuggestion::from_pattern(format!("{}:{}", p.key, first), p)
            })
            .collect()
    }

    /// Most recent successful searches.
    #[must_use]
    pub fn recent_searches(&self, limit: usize) -> Vec<SearchSuggestion> {
        self.history
            .lock()
            .search_history
            .iter()
            .filter(|e| e.successful)
            .take(limit)
            .map(|e| SearchSuggestion::from_entry(e, SuggestionCategory::Recent))
            .collect()
    }

    /// Up to ten learned keys, most frequently used first.
    #[must_use]
    pub fn popular_keys(&self) -> Vec<String> {
        let history = self.history.lock();
        let mut patterns: Vec<&KeyValuePattern> = history.key_value_patterns.iter().collect();
        patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        patterns.into_iter().take(10).map(|p| p.key.clone()).collect()
    }

    /// Up to five learned values for `key`, first seen first.
    #[must_use]
    pub fn popular_values_for_key(&self, key: &str) -> Vec<String> {
        let history = self.history.lock();
        history
            .pattern(&key.to_lowercase())
            .map(|p| p.values.iter().take(5).cloned().collect())
            .unwrap_or_default()
    }

    /// Forget one query (exact match). Learned patterns are kept.
    pub fn remove_search(&self, query: &str) {
        let mut history = self.history.lock();
        history.search_history.retain(|e| e.query != query);
        self.save(&history);
    }

    pub fn clear_history(&self) {
        let mut history = self.history.lock();
        history.search_history.clear();
        history.key_value_patterns.clear();
        self.save(&history);
    }

    #[must_use]
    pub fn stats(&self) -> SuggestionStats {
        let history = self.history.lock();
        let entries = &history.search_history;

        let successful_searches = entries.iter().filter(|e| e.successful).count();
        let key_value_searches = entries.iter().filter(|e| e.kind == QueryType::KeyValue).count();

        SuggestionStats {
            total_entries: entries.len(),
            total_searches: entries.iter().map(|e| u64::from(e.frequency)).sum(),
            successful_searches,
            key_value_searches,
            simple_searches: entries.len() - key_value_searches,
            unique_keys: history.key_value_patterns.len(),
            success_rate: if entries.is_empty() {
                0.0
            } else {
                successful_searches as f64 / entries.len() as f64 * 100.0
            },
        }
    }

    fn load(storage: &dyn KeyValueStorage) -> History {
        let mut history: History = match load_json(storage, SEARCH_CACHE_KEY) {
            Ok(Some(history)) => history,
            Ok(None) => return History::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load search history");
                return History::default();
            }
        };

        let cutoff = now_millis().saturating_sub(HISTORY_RETENTION.as_millis() as u64);
        let before = history.search_history.len();
        history.search_history.retain(|e| e.timestamp > cutoff);
        if history.search_history.len() < before {
            debug!(purged = before - history.search_history.len(), "Old searches purged");
        }
        history
    }

    fn save(&self, history: &History) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = save_json(storage.as_ref(), SEARCH_CACHE_KEY, history) {
            warn!(error = %e, "Failed to save search history");
        }
    }
}
